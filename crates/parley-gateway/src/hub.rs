//! Connection and subscription registry; the fan-out side of the gateway.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use parley_core::ids::UserId;
use parley_core::realtime::{Destination, RealtimePayload, RealtimeSink};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::frames::ServerFrame;

/// Identifies one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug)]
struct Connection {
    user_id: UserId,
    outbox: mpsc::Sender<ServerFrame>,
    destinations: HashSet<Destination>,
}

#[derive(Debug, Default)]
struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    subscribers: HashMap<Destination, HashSet<ConnectionId>>,
}

impl Registry {
    fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;
        for destination in &connection.destinations {
            if let Some(ids) = self.subscribers.get_mut(destination) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.subscribers.remove(destination);
                }
            }
        }
        Some(connection)
    }
}

/// Routes frames to connections by destination.
///
/// Delivery never blocks: a connection whose outbox is full misses the frame,
/// and a connection whose outbox is closed is dropped from the registry.
#[derive(Debug, Default)]
pub struct SubscriptionHub {
    registry: Mutex<Registry>,
}

impl SubscriptionHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection authenticated as `user_id`.
    pub fn register(&self, user_id: UserId, outbox: mpsc::Sender<ServerFrame>) -> ConnectionId {
        let id = ConnectionId::new();
        self.registry().connections.insert(
            id,
            Connection {
                user_id,
                outbox,
                destinations: HashSet::new(),
            },
        );
        debug!(connection = %id, user_id = %user_id, "connection registered");
        id
    }

    /// Adds `destination` to a connection's subscriptions. Returns `false`
    /// when the connection is unknown.
    pub fn subscribe(&self, id: ConnectionId, destination: Destination) -> bool {
        let mut registry = self.registry();
        let Some(connection) = registry.connections.get_mut(&id) else {
            return false;
        };
        connection.destinations.insert(destination.clone());
        registry.subscribers.entry(destination).or_default().insert(id);
        true
    }

    /// Removes `destination` from a connection's subscriptions.
    pub fn unsubscribe(&self, id: ConnectionId, destination: &Destination) {
        let mut registry = self.registry();
        if let Some(connection) = registry.connections.get_mut(&id) {
            connection.destinations.remove(destination);
        }
        if let Some(ids) = registry.subscribers.get_mut(destination) {
            ids.remove(&id);
            if ids.is_empty() {
                registry.subscribers.remove(destination);
            }
        }
    }

    /// Drops a connection and every subscription it held.
    pub fn close(&self, id: ConnectionId) {
        if let Some(connection) = self.registry().remove(id) {
            debug!(
                connection = %id,
                user_id = %connection.user_id,
                subscriptions = connection.destinations.len(),
                "connection closed"
            );
        }
    }

    /// Sends a frame to one connection. Returns whether it was queued.
    pub fn send(&self, id: ConnectionId, frame: ServerFrame) -> bool {
        let outbox = match self.registry().connections.get(&id) {
            Some(connection) => connection.outbox.clone(),
            None => return false,
        };
        outbox.try_send(frame).is_ok()
    }

    /// Number of connections subscribed to `destination`.
    #[must_use]
    pub fn subscriber_count(&self, destination: &Destination) -> usize {
        self.registry()
            .subscribers
            .get(destination)
            .map_or(0, HashSet::len)
    }

    /// Number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.registry().connections.len()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RealtimeSink for SubscriptionHub {
    fn deliver(&self, destination: &Destination, payload: &RealtimePayload) -> usize {
        let mut registry = self.registry();
        let Some(ids) = registry.subscribers.get(destination) else {
            return 0;
        };

        let path = destination.path();
        let mut delivered = 0;
        let mut closed = Vec::new();
        for id in ids {
            let Some(connection) = registry.connections.get(id) else {
                continue;
            };
            let frame = ServerFrame::Event {
                destination: path.clone(),
                payload: payload.clone(),
            };
            match connection.outbox.try_send(frame) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(connection = %id, destination = %destination, "outbox full; frame dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            debug!(connection = %id, destination = %destination, "pruning closed connection");
            registry.remove(id);
        }
        delivered
    }
}
