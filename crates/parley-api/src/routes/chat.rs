//! Routes for the Command Processor.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use parley_command::application::command_handlers;
use parley_command::domain::commands;
use parley_core::event::{MessageSent, ReadMarkerUpdated, RoomCreated};
use parley_core::ids::{MessageId, RoomId, UserId};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub room_id: RoomId,
    pub content: String,
}

/// Request body for POST /room.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub room_name: String,
    /// Invitees. The creator is added automatically.
    #[serde(default)]
    pub target_customer_ids: Vec<UserId>,
}

/// Request body for POST /read.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReadMarkerRequest {
    pub room_id: RoomId,
    pub message_id: MessageId,
}

/// POST /message
#[instrument(skip(state, request), fields(room_id = %request.room_id, sender_id = %user))]
async fn send_message(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<MessageSent>, ApiError> {
    let command = commands::SubmitMessage {
        correlation_id: Uuid::new_v4(),
        room_id: request.room_id,
        sender_id: user,
        content: request.content,
    };

    info!(correlation_id = %command.correlation_id, "handling submit_message command");

    let sent = command_handlers::handle_submit_message(&command, &state.command_context()).await?;
    Ok(Json(sent))
}

/// POST /room
#[instrument(skip(state, request), fields(creator_id = %user))]
async fn create_room(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<RoomCreated>, ApiError> {
    let command = commands::CreateRoom {
        correlation_id: Uuid::new_v4(),
        room_name: request.room_name,
        creator_id: user,
        target_ids: request.target_customer_ids,
    };

    info!(correlation_id = %command.correlation_id, "handling create_room command");

    let created = command_handlers::handle_create_room(&command, &state.command_context()).await?;
    Ok(Json(created))
}

/// POST /read
#[instrument(skip(state, request), fields(room_id = %request.room_id, customer_id = %user))]
async fn update_read_marker(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<UpdateReadMarkerRequest>,
) -> Result<Json<ReadMarkerUpdated>, ApiError> {
    let command = commands::UpdateReadMarker {
        correlation_id: Uuid::new_v4(),
        room_id: request.room_id,
        customer_id: user,
        message_id: request.message_id,
    };

    info!(correlation_id = %command.correlation_id, "handling update_read_marker command");

    let updated =
        command_handlers::handle_update_read_marker(&command, &state.command_context()).await?;
    Ok(Json(updated))
}

/// Returns the router for chat commands.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/message", post(send_message))
        .route("/room", post(create_room))
        .route("/read", post(update_read_marker))
}
