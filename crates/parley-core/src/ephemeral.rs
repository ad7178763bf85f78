//! Ephemeral state store abstraction: keys with a time-to-live and a feed of
//! expiration notifications.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::DomainError;

/// Key-value store with per-key TTL.
///
/// Every mutating operation is atomic per key. Expiration notifications are
/// emitted only when a key's TTL elapses, never for an explicit delete, so a
/// delete racing an expiry yields exactly one of the two outcomes.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Sets `key` to `value` with a fresh TTL. Returns whether the key existed
    /// immediately before.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError>;

    /// Re-arms the TTL of an existing key. Returns `false` (and does nothing)
    /// when the key does not exist.
    async fn renew(&self, key: &str, ttl: Duration) -> Result<bool, DomainError>;

    /// Returns the value of a live key.
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Whether `key` is live.
    async fn exists(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes `key` only if it currently holds `expected`. Returns whether a
    /// delete happened.
    async fn delete_if_value(&self, key: &str, expected: &str) -> Result<bool, DomainError>;

    /// Subscribes to the names of keys whose TTL elapsed.
    fn subscribe_expirations(&self) -> broadcast::Receiver<String>;
}
