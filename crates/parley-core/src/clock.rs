//! Clock abstraction so write timestamps are deterministic under test.

use chrono::{DateTime, Utc};

/// Source of wall-clock time for stamped writes (`sentAt`, `createdAt`).
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
