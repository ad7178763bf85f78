//! Read-side routes served from the projection's read model.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use parley_core::ids::{MessageId, RoomId};
use parley_core::model::{ConversationView, MessageRecord, ReadMarker};
use parley_core::realtime::PresenceStatus;
use parley_projection::application::query_handlers;
use tracing::instrument;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /rooms
#[instrument(skip(state), fields(customer_id = %user))]
async fn rooms(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<ConversationView>>, ApiError> {
    let views = query_handlers::get_rooms_for_user(user, state.read_model.as_ref()).await?;
    Ok(Json(views))
}

/// GET /message/roomId/{room_id}
#[instrument(skip(state), fields(customer_id = %user))]
async fn latest_messages(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(room_id): Path<i64>,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    let messages =
        query_handlers::get_latest_messages(RoomId(room_id), user, state.read_model.as_ref())
            .await?;
    Ok(Json(messages))
}

/// GET /message/roomId/{room_id}/index/{message_id}
#[instrument(skip(state), fields(customer_id = %user))]
async fn messages_before(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((room_id, message_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    let messages = query_handlers::get_messages_before(
        RoomId(room_id),
        MessageId(message_id),
        user,
        state.read_model.as_ref(),
    )
    .await?;
    Ok(Json(messages))
}

/// GET /readMarkers/roomId/{room_id}
#[instrument(skip(state), fields(customer_id = %user))]
async fn read_markers(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(room_id): Path<i64>,
) -> Result<Json<Vec<ReadMarker>>, ApiError> {
    let markers =
        query_handlers::get_read_markers(RoomId(room_id), user, state.read_model.as_ref()).await?;
    Ok(Json(markers))
}

/// GET /onlineStatus/roomId/{room_id}
///
/// Online status of every participant, in participant order.
#[instrument(skip(state), fields(customer_id = %user))]
async fn online_status(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(room_id): Path<i64>,
) -> Result<Json<Vec<PresenceStatus>>, ApiError> {
    let view =
        query_handlers::get_room_for_participant(RoomId(room_id), user, state.read_model.as_ref())
            .await?;
    let statuses = state
        .gateway
        .presence
        .online_statuses(&view.participant_ids)
        .await?;
    Ok(Json(statuses))
}

/// Returns the router for chat queries.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(rooms))
        .route("/message/roomId/{room_id}", get(latest_messages))
        .route(
            "/message/roomId/{room_id}/index/{message_id}",
            get(messages_before),
        )
        .route("/readMarkers/roomId/{room_id}", get(read_markers))
        .route("/onlineStatus/roomId/{room_id}", get(online_status))
}
