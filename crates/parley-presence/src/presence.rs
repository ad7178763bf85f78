//! Presence Tracker.
//!
//! Per user: `Offline` or `Online`, where `Online` is exactly "the presence
//! key is live". The key's value is the token of the session that last
//! announced the user, so a disconnect from a superseded session does not
//! take a reconnected user offline.

use std::sync::Arc;
use std::time::Duration;

use parley_core::directory::{CallPolicy, MembershipDirectory};
use parley_core::ephemeral::EphemeralStore;
use parley_core::error::DomainError;
use parley_core::ids::UserId;
use parley_core::realtime::{Destination, PresenceStatus, RealtimePayload, RealtimeSink};
use parley_core::sync::KeyedSerializer;
use tracing::{debug, info};

/// Prefix of presence keys in the ephemeral store.
pub const PRESENCE_KEY_PREFIX: &str = "online_user:";

/// Default time a user stays online without a heartbeat.
pub const DEFAULT_PRESENCE_TTL: Duration = Duration::from_secs(300);

/// Ephemeral-store key holding `user_id`'s presence.
#[must_use]
pub fn presence_key(user_id: UserId) -> String {
    format!("{PRESENCE_KEY_PREFIX}{user_id}")
}

#[derive(Debug, Clone, Copy)]
enum PresenceSignal<'a> {
    Connect { session: &'a str },
    Heartbeat { session: &'a str },
    Disconnect { session: &'a str },
    Expired,
}

/// Tracks online/offline state and fans it out to every room of the user.
pub struct PresenceTracker {
    store: Arc<dyn EphemeralStore>,
    membership: Arc<dyn MembershipDirectory>,
    sink: Arc<dyn RealtimeSink>,
    ttl: Duration,
    policy: CallPolicy,
    serializer: KeyedSerializer<UserId>,
}

impl PresenceTracker {
    #[must_use]
    pub fn new(
        store: Arc<dyn EphemeralStore>,
        membership: Arc<dyn MembershipDirectory>,
        sink: Arc<dyn RealtimeSink>,
        ttl: Duration,
        policy: CallPolicy,
    ) -> Self {
        Self {
            store,
            membership,
            sink,
            ttl,
            policy,
            serializer: KeyedSerializer::new(),
        }
    }

    /// A session for `user_id` opened. Always announces the user online.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store or the membership lookup fails.
    pub async fn connect(&self, user_id: UserId, session: &str) -> Result<(), DomainError> {
        self.transition(user_id, PresenceSignal::Connect { session })
            .await
    }

    /// Keep-alive. Only renews the TTL while the user is online; otherwise
    /// behaves like [`Self::connect`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store or the membership lookup fails.
    pub async fn heartbeat(&self, user_id: UserId, session: &str) -> Result<(), DomainError> {
        self.transition(user_id, PresenceSignal::Heartbeat { session })
            .await
    }

    /// A session closed. Takes the user offline only if this session still
    /// owns the presence key.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store or the membership lookup fails.
    pub async fn disconnect(&self, user_id: UserId, session: &str) -> Result<(), DomainError> {
        self.transition(user_id, PresenceSignal::Disconnect { session })
            .await
    }

    /// The presence key of `user_id` expired.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store or the membership lookup fails.
    pub async fn expired(&self, user_id: UserId) -> Result<(), DomainError> {
        self.transition(user_id, PresenceSignal::Expired).await
    }

    /// Whether `user_id` is currently online.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store fails.
    pub async fn is_online(&self, user_id: UserId) -> Result<bool, DomainError> {
        self.store.exists(&presence_key(user_id)).await
    }

    /// Online status of each of `user_ids`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store fails.
    pub async fn online_statuses(
        &self,
        user_ids: &[UserId],
    ) -> Result<Vec<PresenceStatus>, DomainError> {
        let mut statuses = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            statuses.push(PresenceStatus {
                customer_id: *user_id,
                online: self.is_online(*user_id).await?,
            });
        }
        Ok(statuses)
    }

    async fn transition(
        &self,
        user_id: UserId,
        signal: PresenceSignal<'_>,
    ) -> Result<(), DomainError> {
        let _guard = self.serializer.lock(user_id).await;
        let key = presence_key(user_id);

        let announce = match signal {
            PresenceSignal::Connect { session } => {
                self.store.set(&key, session, self.ttl).await?;
                Some(true)
            }
            PresenceSignal::Heartbeat { session } => {
                if self.store.renew(&key, self.ttl).await? {
                    None
                } else {
                    self.store.set(&key, session, self.ttl).await?;
                    Some(true)
                }
            }
            PresenceSignal::Disconnect { session } => self
                .store
                .delete_if_value(&key, session)
                .await?
                .then_some(false),
            // The user may have reconnected between expiry and this signal.
            PresenceSignal::Expired => (!self.store.exists(&key).await?).then_some(false),
        };

        match announce {
            Some(online) => self.fan_out(user_id, online).await,
            None => {
                debug!(user_id = %user_id, ?signal, "presence unchanged");
                Ok(())
            }
        }
    }

    async fn fan_out(&self, user_id: UserId, online: bool) -> Result<(), DomainError> {
        let rooms = self
            .policy
            .run("membership.rooms_for_user", || {
                self.membership.rooms_for_user(user_id)
            })
            .await?;

        let payload = RealtimePayload::Presence(PresenceStatus {
            customer_id: user_id,
            online,
        });
        let mut delivered = 0;
        for room_id in &rooms {
            delivered += self
                .sink
                .deliver(&Destination::RoomPresence(*room_id), &payload);
        }
        info!(
            user_id = %user_id,
            online,
            rooms = rooms.len(),
            delivered,
            "presence changed"
        );
        Ok(())
    }
}
