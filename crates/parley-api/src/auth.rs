//! Bearer-token authentication for HTTP handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use parley_core::ids::UserId;
use parley_gateway::auth::bearer_token;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// The customer the request's bearer token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token);

        state
            .gateway
            .authenticate(token)
            .map(Self)
            .map_err(|err| {
                debug!(error = %err, "request rejected");
                ApiError(err.into())
            })
    }
}
