//! In-memory TTL store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parley_core::ephemeral::EphemeralStore;
use parley_core::error::DomainError;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

const EXPIRATION_FEED_CAPACITY: usize = 1024;

#[derive(Debug)]
struct Entry {
    value: String,
    deadline: Instant,
    /// Identifies the timer currently armed for this entry. A timer that
    /// fires with a stale generation was superseded and does nothing.
    generation: u64,
    timer: JoinHandle<()>,
}

#[derive(Debug)]
struct Inner {
    entries: Mutex<HashMap<String, Entry>>,
    expirations: broadcast::Sender<String>,
    generations: AtomicU64,
}

impl Inner {
    fn expire(&self, key: &str, generation: u64) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|entry| entry.generation == generation) {
            entries.remove(key);
            drop(entries);
            debug!(key, "ephemeral key expired");
            // No subscribers is fine: nobody is interested in this key.
            let _ = self.expirations.send(key.to_owned());
        }
    }
}

/// Process-local ephemeral store.
///
/// Each live key owns exactly one expiry timer. Re-arming a key (set or
/// renew) aborts the previous timer; deleting a key aborts its timer, so an
/// explicitly deleted key never produces an expiration notification.
#[derive(Debug, Clone)]
pub struct InMemoryEphemeralStore {
    inner: Arc<Inner>,
}

impl InMemoryEphemeralStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (expirations, _) = broadcast::channel(EXPIRATION_FEED_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                expirations,
                generations: AtomicU64::new(0),
            }),
        }
    }

    /// Remaining TTL of a live key.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.entries()
            .get(key)
            .map(|entry| entry.deadline.saturating_duration_since(Instant::now()))
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether no key is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn arm_timer(&self, key: &str, ttl: Duration) -> (u64, Instant, JoinHandle<()>) {
        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + ttl;
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let key = key.to_owned();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = inner.upgrade() {
                inner.expire(&key, generation);
            }
        });
        (generation, deadline, timer)
    }
}

impl Default for InMemoryEphemeralStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let entries = self.entries.get_mut().unwrap_or_else(PoisonError::into_inner);
        for entry in entries.values() {
            entry.timer.abort();
        }
    }
}

#[async_trait]
impl EphemeralStore for InMemoryEphemeralStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        let (generation, deadline, timer) = self.arm_timer(key, ttl);
        let previous = self.entries().insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                deadline,
                generation,
                timer,
            },
        );
        Ok(previous.is_some_and(|entry| {
            entry.timer.abort();
            true
        }))
    }

    async fn renew(&self, key: &str, ttl: Duration) -> Result<bool, DomainError> {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return Ok(false);
        };
        let (generation, deadline, timer) = self.arm_timer(key, ttl);
        entry.timer.abort();
        entry.generation = generation;
        entry.deadline = deadline;
        entry.timer = timer;
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.entries().get(key).map(|entry| entry.value.clone()))
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.entries().contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let removed = self.entries().remove(key);
        Ok(removed.is_some_and(|entry| {
            entry.timer.abort();
            true
        }))
    }

    async fn delete_if_value(&self, key: &str, expected: &str) -> Result<bool, DomainError> {
        let mut entries = self.entries();
        if entries.get(key).is_some_and(|entry| entry.value == expected) {
            if let Some(entry) = entries.remove(key) {
                entry.timer.abort();
            }
            return Ok(true);
        }
        Ok(false)
    }

    fn subscribe_expirations(&self) -> broadcast::Receiver<String> {
        self.inner.expirations.subscribe()
    }
}
