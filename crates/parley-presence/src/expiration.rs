//! Routes ephemeral-store expirations to the state machine owning the key.

use std::sync::Arc;

use parley_core::ids::{RoomId, UserId};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::presence::{PRESENCE_KEY_PREFIX, PresenceTracker};
use crate::typing::{TYPING_KEY_PREFIX, TypingTracker};

/// An expired key, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiredKey {
    Presence(UserId),
    Typing(RoomId, UserId),
}

impl ExpiredKey {
    /// Decodes a key name. Keys owned by nobody yield `None`.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        if let Some(user) = key.strip_prefix(PRESENCE_KEY_PREFIX) {
            return user.parse().ok().map(Self::Presence);
        }
        let (room, user) = key.strip_prefix(TYPING_KEY_PREFIX)?.split_once(':')?;
        Some(Self::Typing(room.parse().ok()?, user.parse().ok()?))
    }
}

/// Spawns the task draining `expirations`. Each notification is handled on
/// its own task; per-key ordering is kept by the trackers themselves.
pub fn spawn_expiration_router(
    mut expirations: broadcast::Receiver<String>,
    presence: Arc<PresenceTracker>,
    typing: Arc<TypingTracker>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match expirations.recv().await {
                Ok(key) => route(&key, &presence, &typing),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "expiration feed lagged; notifications lost");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("expiration feed closed");
    })
}

fn route(key: &str, presence: &Arc<PresenceTracker>, typing: &Arc<TypingTracker>) {
    match ExpiredKey::parse(key) {
        Some(ExpiredKey::Presence(user_id)) => {
            let presence = Arc::clone(presence);
            tokio::spawn(async move {
                if let Err(err) = presence.expired(user_id).await {
                    warn!(user_id = %user_id, error = %err, "presence expiry not announced");
                }
            });
        }
        Some(ExpiredKey::Typing(room_id, user_id)) => {
            let typing = Arc::clone(typing);
            tokio::spawn(async move {
                if let Err(err) = typing.expired(room_id, user_id).await {
                    warn!(room_id = %room_id, user_id = %user_id, error = %err, "typing expiry not announced");
                }
            });
        }
        None => debug!(key, "ignoring expiration of unowned key"),
    }
}
