//! Projection error types.

use parley_core::error::DomainError;
use thiserror::Error;

/// Failure while applying one event to the read model.
///
/// The consumer loop logs these and moves on to the next event.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The read-model store rejected a read or write.
    #[error("read model store failed: {0}")]
    Store(#[from] DomainError),
}
