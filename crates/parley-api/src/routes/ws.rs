//! WebSocket endpoint of the Real-Time Gateway.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use futures::{SinkExt, StreamExt};
use parley_core::ids::UserId;
use parley_gateway::auth::bearer_token;
use parley_gateway::{GatewayServices, Session};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// GET /ws/chat?token=…
///
/// The credential is checked before the upgrade: a bad token never gets a
/// socket.
async fn connect(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = params.token.as_deref().or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
    });
    let user_id = match state.gateway.authenticate(token) {
        Ok(user_id) => user_id,
        Err(err) => {
            warn!(error = %err, "websocket connection rejected");
            return ApiError(err.into()).into_response();
        }
    };

    match upgrade {
        Ok(upgrade) => {
            let services = Arc::clone(&state.gateway);
            upgrade.on_upgrade(move |socket| run(socket, services, user_id))
        }
        Err(rejection) => rejection.into_response(),
    }
}

async fn run(socket: WebSocket, services: Arc<GatewayServices>, user_id: UserId) {
    let (session, mut frames) = Session::open(services, user_id).await;
    let (mut outgoing, mut incoming) = socket.split();

    let connection = session.id();
    let writer = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(err) => {
                    warn!(connection = %connection, error = %err, "frame not serializable");
                    continue;
                }
            };
            if outgoing.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = incoming.next().await {
        match message {
            Ok(Message::Text(text)) => session.handle_text(text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(connection = %connection, error = %err, "socket read failed");
                break;
            }
        }
    }

    session.close().await;
    writer.abort();
}

/// Returns the router for the WebSocket endpoint.
pub fn router() -> Router<AppState> {
    Router::new().route("/chat", get(connect))
}
