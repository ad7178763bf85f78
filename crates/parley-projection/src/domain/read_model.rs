//! Read-model storage abstraction.

use async_trait::async_trait;
use parley_core::error::DomainError;
use parley_core::ids::{MessageId, RoomId, UserId};
use parley_core::model::{ConversationView, MessageRecord, ReadMarker};

/// Document store holding the projection's read models.
///
/// Each method is atomic on its own. Callers serialize per room by consuming
/// one partition sequentially.
#[async_trait]
pub trait ReadModelStore: Send + Sync {
    /// Looks up the view of a room.
    async fn find_view(&self, room_id: RoomId) -> Result<Option<ConversationView>, DomainError>;

    /// Stores `view` unless one already exists for its room. Returns whether
    /// it was inserted.
    async fn insert_view_if_absent(&self, view: ConversationView) -> Result<bool, DomainError>;

    /// Overwrites the view of `view.room_id`.
    async fn replace_view(&self, view: ConversationView) -> Result<(), DomainError>;

    /// Views listing `user_id` as a participant, most recently updated first.
    async fn views_for_participant(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationView>, DomainError>;

    /// Stores a message record unless its id is already present. Returns
    /// whether it was inserted.
    async fn insert_message_if_absent(&self, record: MessageRecord) -> Result<bool, DomainError>;

    /// Up to `limit` messages of a room, newest (highest id) first.
    async fn latest_messages(
        &self,
        room_id: RoomId,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, DomainError>;

    /// Up to `limit` messages of a room with an id strictly below `before`,
    /// newest first.
    async fn messages_before(
        &self,
        room_id: RoomId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, DomainError>;

    /// Writes `marker` if it strictly advances the stored one (or none is
    /// stored). Returns whether the stored marker changed.
    async fn advance_read_marker(&self, marker: ReadMarker) -> Result<bool, DomainError>;

    /// Every read marker of a room, ordered by customer id.
    async fn read_markers(&self, room_id: RoomId) -> Result<Vec<ReadMarker>, DomainError>;
}
