//! Domain error taxonomy.

use thiserror::Error;

/// Top-level domain error type shared by every component.
///
/// Request-facing layers collapse these into a small set of externally
/// visible outcomes (bad input, unauthorized, forbidden, not found, internal
/// failure). The real-time fan-out path never surfaces them to a caller.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Bad input. Nothing was persisted and no event was emitted.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced room, user or message does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An external collaborator was unreachable, timed out or errored.
    #[error("dependency error: {0}")]
    Dependency(String),

    /// Missing or invalid credential.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Valid identity without the membership required for the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Persistence or transport failure inside the platform.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Whether retrying the same operation later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Dependency(_) | Self::Infrastructure(_))
    }
}
