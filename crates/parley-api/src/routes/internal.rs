//! Collaborator endpoints for other services on the internal network.
//! Not authenticated.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use parley_core::ids::{RoomId, UserId};
use parley_projection::application::query_handlers;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomsResponse {
    pub room_ids: Vec<RoomId>,
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub valid: bool,
}

/// GET /internal/rooms/customer/{customer_id}
async fn rooms_for_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> Result<Json<RoomsResponse>, ApiError> {
    let views =
        query_handlers::get_rooms_for_user(UserId(customer_id), state.read_model.as_ref()).await?;
    Ok(Json(RoomsResponse {
        room_ids: views.into_iter().map(|view| view.room_id).collect(),
    }))
}

/// GET /internal/valid/roomId/{room_id}/customerId/{customer_id}
async fn is_member(
    State(state): State<AppState>,
    Path((room_id, customer_id)): Path<(i64, i64)>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let valid = query_handlers::is_room_member(
        RoomId(room_id),
        UserId(customer_id),
        state.read_model.as_ref(),
    )
    .await?;
    Ok(Json(MembershipResponse { valid }))
}

/// Returns the router for internal collaborator endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms/customer/{customer_id}", get(rooms_for_customer))
        .route(
            "/valid/roomId/{room_id}/customerId/{customer_id}",
            get(is_member),
        )
}
