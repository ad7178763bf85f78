//! Per-key serialization of state transitions.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

const PRUNE_THRESHOLD: usize = 1024;

/// Hands out one async lock per key so that all transitions for the same
/// entity (a user, a room, a `(room, user)` pair) run one at a time, while
/// different keys never contend.
#[derive(Debug)]
pub struct KeyedSerializer<K> {
    slots: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedSerializer<K> {
    /// Creates an empty serializer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Waits for exclusive access to `key`. Access is released when the guard
    /// is dropped.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            if slots.len() >= PRUNE_THRESHOLD {
                // Unheld and unawaited slots are only referenced by the map.
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            Arc::clone(slots.entry(key).or_default())
        };
        slot.lock_owned().await
    }

    /// Number of tracked keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no key is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedSerializer<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_same_key_is_serialized() {
        // Arrange
        let serializer = Arc::new(KeyedSerializer::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        // Act
        let first = {
            let serializer = Arc::clone(&serializer);
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _guard = serializer.lock(1_u32).await;
                log.lock().unwrap().push("first:start");
                tokio::time::sleep(Duration::from_millis(10)).await;
                log.lock().unwrap().push("first:end");
            })
        };
        tokio::task::yield_now().await;
        let second = {
            let serializer = Arc::clone(&serializer);
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _guard = serializer.lock(1_u32).await;
                log.lock().unwrap().push("second");
            })
        };
        first.await.unwrap();
        second.await.unwrap();

        // Assert
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:start", "first:end", "second"]
        );
    }

    #[tokio::test]
    async fn test_different_keys_do_not_contend() {
        let serializer = KeyedSerializer::new();

        let _a = serializer.lock("a").await;
        let _b = serializer.lock("b").await;

        assert_eq!(serializer.len(), 2);
    }
}
