//! Relational write-store abstraction used by the command processor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::ids::{MessageId, RoomId, UserId};

/// A message row about to be inserted. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// A persisted message row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub message_id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// A room row plus its participant rows, inserted in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoom {
    pub room_name: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    /// De-duplicated, creator first.
    pub participant_ids: Vec<UserId>,
}

/// Repository trait for the relational write store.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Whether a room row exists.
    async fn room_exists(&self, room_id: RoomId) -> Result<bool, DomainError>;

    /// Whether `user_id` has a participant row in `room_id`.
    async fn is_participant(&self, room_id: RoomId, user_id: UserId) -> Result<bool, DomainError>;

    /// Inserts a message row and returns it with its assigned id.
    async fn insert_message(&self, message: NewMessage) -> Result<StoredMessage, DomainError>;

    /// Inserts a room and all participant rows atomically.
    async fn insert_room(&self, room: NewRoom) -> Result<RoomId, DomainError>;

    /// Advances a participant's last-read message id. Returns `false` when the
    /// monotonic guard rejected the write (the stored id was not lower).
    async fn update_read_marker(
        &self,
        room_id: RoomId,
        customer_id: UserId,
        message_id: MessageId,
    ) -> Result<bool, DomainError>;
}
