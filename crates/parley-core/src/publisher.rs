//! Producer side of the durable event log.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::event::EventEnvelope;

/// Appends records to the event log, partitioned by the envelope's room id.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one record.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;
}
