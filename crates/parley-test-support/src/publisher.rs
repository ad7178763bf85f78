//! Test publishers — mock `EventPublisher` implementations for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parley_core::error::DomainError;
use parley_core::event::EventEnvelope;
use parley_core::publisher::EventPublisher;

/// A publisher that records every published envelope and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    published: Mutex<Vec<EventEnvelope>>,
}

impl RecordingEventPublisher {
    /// Create an empty recording publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all envelopes that were published.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published(&self) -> Vec<EventEnvelope> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.published.lock().unwrap().push(event);
        Ok(())
    }
}

/// A publisher that always returns an infrastructure error and counts the
/// attempts it rejected.
#[derive(Debug, Default)]
pub struct FailingEventPublisher {
    attempts: AtomicU32,
}

impl FailingEventPublisher {
    /// Create a failing publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publish calls made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventPublisher for FailingEventPublisher {
    async fn publish(&self, _event: EventEnvelope) -> Result<(), DomainError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DomainError::Infrastructure("broker unavailable".into()))
    }
}
