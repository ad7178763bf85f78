//! Parley — HTTP and WebSocket server.
//!
//! Chat commands and queries over HTTP, real-time subscriptions over a
//! WebSocket, and the internal collaborator endpoints other services use to
//! check room membership.

pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod platform;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// The full route tree.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest(
            "/api/v1/chat",
            routes::chat::router().merge(routes::queries::router()),
        )
        .nest("/internal", routes::internal::router())
        .nest("/ws", routes::ws::router())
        .with_state(state)
}
