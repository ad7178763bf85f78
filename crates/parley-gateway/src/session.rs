//! Per-connection protocol handling, independent of the socket transport.

use std::sync::Arc;

use parley_core::ids::{RoomId, UserId};
use parley_core::realtime::Destination;
use parley_presence::{PresenceTracker, TypingTracker};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::{AuthError, TokenVerifier};
use crate::authorizer::SubscriptionAuthorizer;
use crate::frames::{ClientFrame, ServerFrame};
use crate::hub::{ConnectionId, SubscriptionHub};

/// Frames buffered per connection before new ones are dropped.
pub const OUTBOX_CAPACITY: usize = 256;

/// Everything a session needs, shared by all connections.
pub struct GatewayServices {
    pub verifier: TokenVerifier,
    pub hub: Arc<SubscriptionHub>,
    pub authorizer: SubscriptionAuthorizer,
    pub presence: Arc<PresenceTracker>,
    pub typing: Arc<TypingTracker>,
}

impl GatewayServices {
    /// Binds a connection credential to a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` for a missing or invalid token.
    pub fn authenticate(&self, token: Option<&str>) -> Result<UserId, AuthError> {
        self.verifier.verify(token.ok_or(AuthError::MissingToken)?)
    }
}

/// One authenticated connection.
///
/// The presence key of the user holds this session's connection id, so only
/// the session that last announced the user can take it offline.
pub struct Session {
    id: ConnectionId,
    user_id: UserId,
    services: Arc<GatewayServices>,
}

impl Session {
    /// Registers the connection and announces the user online. Frames for
    /// the client arrive on the returned receiver.
    pub async fn open(
        services: Arc<GatewayServices>,
        user_id: UserId,
    ) -> (Self, mpsc::Receiver<ServerFrame>) {
        let (outbox, frames) = mpsc::channel(OUTBOX_CAPACITY);
        let id = services.hub.register(user_id, outbox);
        if let Err(err) = services.presence.connect(user_id, &id.to_string()).await {
            warn!(connection = %id, user_id = %user_id, error = %err, "presence not announced");
        }
        info!(connection = %id, user_id = %user_id, "session opened");

        (
            Self {
                id,
                user_id,
                services,
            },
            frames,
        )
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Handles one text frame from the client.
    pub async fn handle_text(&self, text: &str) {
        match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => self.handle(frame).await,
            Err(err) => {
                debug!(connection = %self.id, error = %err, "malformed client frame");
                self.reply(ServerFrame::error(format!("malformed frame: {err}")));
            }
        }
    }

    /// Handles one decoded client frame.
    pub async fn handle(&self, frame: ClientFrame) {
        match frame {
            ClientFrame::Subscribe { destination } => self.subscribe(destination).await,
            ClientFrame::Unsubscribe { destination } => self.unsubscribe(destination),
            ClientFrame::Typing { room_id, is_typing } => self.typing(room_id, is_typing).await,
            ClientFrame::Heartbeat => {
                let session = self.id.to_string();
                if let Err(err) = self.services.presence.heartbeat(self.user_id, &session).await {
                    warn!(connection = %self.id, error = %err, "heartbeat not applied");
                }
            }
        }
    }

    /// Drops every subscription and takes the user offline if this session
    /// still owns their presence.
    pub async fn close(self) {
        self.services.hub.close(self.id);
        let session = self.id.to_string();
        if let Err(err) = self.services.presence.disconnect(self.user_id, &session).await {
            warn!(connection = %self.id, error = %err, "presence not withdrawn");
        }
        info!(connection = %self.id, user_id = %self.user_id, "session closed");
    }

    async fn subscribe(&self, path: String) {
        let destination = match Destination::parse(&path, self.user_id) {
            Ok(destination) => destination,
            Err(err) => return self.reject(err.to_string(), path),
        };

        match self.services.authorizer.authorize(self.user_id, &destination).await {
            Ok(()) => {
                self.services.hub.subscribe(self.id, destination);
                self.reply(ServerFrame::Subscribed { destination: path });
            }
            Err(err) => self.reject(err.to_string(), path),
        }
    }

    fn unsubscribe(&self, path: String) {
        if let Ok(destination) = Destination::parse(&path, self.user_id) {
            self.services.hub.unsubscribe(self.id, &destination);
        }
        self.reply(ServerFrame::Unsubscribed { destination: path });
    }

    async fn typing(&self, room_id: RoomId, is_typing: bool) {
        let destination = Destination::RoomTyping(room_id);
        if let Err(err) = self.services.authorizer.authorize(self.user_id, &destination).await {
            return self.reject(err.to_string(), destination.path());
        }

        let typing = &self.services.typing;
        let result = if is_typing {
            typing.keystroke(room_id, self.user_id).await
        } else {
            typing.stop(room_id, self.user_id).await
        };
        if let Err(err) = result {
            warn!(connection = %self.id, room_id = %room_id, error = %err, "typing signal not applied");
        }
    }

    fn reject(&self, message: String, destination: String) {
        self.reply(ServerFrame::Error {
            message,
            destination: Some(destination),
        });
    }

    fn reply(&self, frame: ServerFrame) {
        if !self.services.hub.send(self.id, frame) {
            debug!(connection = %self.id, "reply dropped");
        }
    }
}
