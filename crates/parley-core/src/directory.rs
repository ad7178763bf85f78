//! External collaborator contracts and the call policy applied to them.
//!
//! Every collaborator call may hang or fail. A hang would block the owning
//! partition's whole downstream fan-out, so callers go through
//! [`CallPolicy::run`], which bounds each attempt with a timeout and retries
//! retryable failures a fixed number of times.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::DomainError;
use crate::ids::{RoomId, UserId};

/// Resolves display names for message and participant enrichment.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Returns the user's display name, or `DomainError::NotFound`.
    async fn display_name(&self, user_id: UserId) -> Result<String, DomainError>;
}

/// Answers room-membership questions.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// Whether `user_id` participates in `room_id`.
    async fn is_room_member(&self, room_id: RoomId, user_id: UserId) -> Result<bool, DomainError>;

    /// Every room `user_id` participates in.
    async fn rooms_for_user(&self, user_id: UserId) -> Result<Vec<RoomId>, DomainError>;
}

/// Timeout and retry bounds for collaborator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Upper bound for a single attempt.
    pub timeout: Duration,
    /// Total attempts, including the first. Treated as at least one.
    pub attempts: u32,
    /// Base delay between attempts; grows linearly with the attempt number.
    pub backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

impl CallPolicy {
    /// Runs `call` under this policy.
    ///
    /// Non-retryable errors (`NotFound`, `Validation`, ...) are returned as-is
    /// on the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Dependency` once every attempt has failed or
    /// timed out.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let attempts = self.attempts.max(1);
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) if !err.is_retryable() => return Err(err),
                Ok(Err(err)) => {
                    warn!(operation, attempt, error = %err, "collaborator call failed");
                    last_failure = err.to_string();
                }
                Err(_) => {
                    warn!(operation, attempt, timeout = ?self.timeout, "collaborator call timed out");
                    last_failure = format!("timed out after {:?}", self.timeout);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.backoff * attempt).await;
            }
        }

        Err(DomainError::Dependency(format!(
            "{operation} failed after {attempts} attempts: {last_failure}"
        )))
    }
}
