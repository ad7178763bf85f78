//! Typing Indicator.
//!
//! Per `(room, user)`: `NotTyping` or `Typing`, where `Typing` is exactly
//! "the typing key is live". The key's existence decides whether a
//! "started" record was already sent, which debounces rapid keystrokes.

use std::sync::Arc;
use std::time::Duration;

use parley_core::ephemeral::EphemeralStore;
use parley_core::error::DomainError;
use parley_core::ids::{RoomId, UserId};
use parley_core::realtime::{Destination, RealtimePayload, RealtimeSink, TypingStatus};
use parley_core::sync::KeyedSerializer;
use tracing::debug;

/// Prefix of typing keys in the ephemeral store.
pub const TYPING_KEY_PREFIX: &str = "typing:";

/// Default time a typing indicator survives without a keystroke.
pub const DEFAULT_TYPING_TTL: Duration = Duration::from_secs(2);

/// Ephemeral-store key for `user_id` typing in `room_id`.
#[must_use]
pub fn typing_key(room_id: RoomId, user_id: UserId) -> String {
    format!("{TYPING_KEY_PREFIX}{room_id}:{user_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypingSignal {
    Keystroke,
    Stop,
    Expired,
}

/// Publishes started/stopped typing records to a room's typing stream.
pub struct TypingTracker {
    store: Arc<dyn EphemeralStore>,
    sink: Arc<dyn RealtimeSink>,
    ttl: Duration,
    serializer: KeyedSerializer<(RoomId, UserId)>,
}

impl TypingTracker {
    #[must_use]
    pub fn new(store: Arc<dyn EphemeralStore>, sink: Arc<dyn RealtimeSink>, ttl: Duration) -> Self {
        Self {
            store,
            sink,
            ttl,
            serializer: KeyedSerializer::new(),
        }
    }

    /// A keystroke. Announces "started" only on the first one; every
    /// keystroke re-arms the indicator's TTL.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store fails.
    pub async fn keystroke(&self, room_id: RoomId, user_id: UserId) -> Result<(), DomainError> {
        self.transition(room_id, user_id, TypingSignal::Keystroke)
            .await
    }

    /// An explicit stop. Always announces "stopped".
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store fails.
    pub async fn stop(&self, room_id: RoomId, user_id: UserId) -> Result<(), DomainError> {
        self.transition(room_id, user_id, TypingSignal::Stop).await
    }

    /// The typing key expired without an explicit stop.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store fails.
    pub async fn expired(&self, room_id: RoomId, user_id: UserId) -> Result<(), DomainError> {
        self.transition(room_id, user_id, TypingSignal::Expired)
            .await
    }

    async fn transition(
        &self,
        room_id: RoomId,
        user_id: UserId,
        signal: TypingSignal,
    ) -> Result<(), DomainError> {
        let _guard = self.serializer.lock((room_id, user_id)).await;
        let key = typing_key(room_id, user_id);

        let announce = match signal {
            // Once the key has expired, a keystroke announces "started" even
            // if the expiry has not been routed yet. That pending expiry then
            // finds the key live and stays silent, so clients may see two
            // "started" records in a row.
            TypingSignal::Keystroke => (!self.store.set(&key, "1", self.ttl).await?).then_some(true),
            TypingSignal::Stop => {
                self.store.delete(&key).await?;
                Some(false)
            }
            // A keystroke may have re-armed the key after it expired.
            TypingSignal::Expired => (!self.store.exists(&key).await?).then_some(false),
        };

        if let Some(is_typing) = announce {
            let delivered = self.sink.deliver(
                &Destination::RoomTyping(room_id),
                &RealtimePayload::Typing(TypingStatus {
                    room_id,
                    customer_id: user_id,
                    is_typing,
                }),
            );
            debug!(room_id = %room_id, user_id = %user_id, is_typing, ?signal, delivered, "typing changed");
        }
        Ok(())
    }
}
