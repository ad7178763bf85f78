//! Events carried by the durable event log.
//!
//! Every record is an [`EventEnvelope`]: metadata plus one variant of the
//! closed [`ChatEventKind`] set. Consumers match on the kind exhaustively, so
//! adding a variant is a compile error in every consumer until handled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{MessageId, RoomId, UserId};
use crate::model::ConversationView;

/// Metadata attached to every log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Schema tag, e.g. `chat.message_sent`.
    pub event_type: String,
    /// Partition key. Ordering is only guaranteed per key.
    pub room_id: RoomId,
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// One participant as described at room creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDescriptor {
    pub id: UserId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

/// Emitted when a room and its participant rows are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreated {
    pub room_id: RoomId,
    pub room_name: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<ParticipantDescriptor>,
}

/// Emitted when a message row is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSent {
    pub message_id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_display_name: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Emitted for every read-marker write, whether or not the write store's
/// monotonic guard accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMarkerUpdated {
    pub room_id: RoomId,
    pub customer_id: UserId,
    pub last_read_message_id: MessageId,
}

/// Derived: the projection changed a conversation view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomViewUpdated {
    pub view: ConversationView,
}

/// Derived: one participant's unread flag actually flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadStatusChanged {
    pub room_id: RoomId,
    pub customer_id: UserId,
    pub unread: bool,
}

/// Closed set of record payloads on the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChatEventKind {
    /// A room was created.
    RoomCreated(RoomCreated),
    /// A message was sent.
    MessageSent(MessageSent),
    /// A read marker was written.
    ReadMarkerUpdated(ReadMarkerUpdated),
    /// A conversation view changed (derived).
    RoomViewUpdated(RoomViewUpdated),
    /// An unread flag flipped (derived).
    ReadStatusChanged(ReadStatusChanged),
}

impl ChatEventKind {
    /// Schema tag for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RoomCreated(_) => "chat.room_created",
            Self::MessageSent(_) => "chat.message_sent",
            Self::ReadMarkerUpdated(_) => "chat.read_marker_updated",
            Self::RoomViewUpdated(_) => "chat.room_view_updated",
            Self::ReadStatusChanged(_) => "chat.read_status_changed",
        }
    }

    /// The room this payload belongs to; used as the partition key.
    #[must_use]
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::RoomCreated(e) => e.room_id,
            Self::MessageSent(e) => e.room_id,
            Self::ReadMarkerUpdated(e) => e.room_id,
            Self::RoomViewUpdated(e) => e.view.room_id,
            Self::ReadStatusChanged(e) => e.room_id,
        }
    }

    /// Whether the projection engine produced this payload.
    #[must_use]
    pub fn is_derived(&self) -> bool {
        match self {
            Self::RoomCreated(_) | Self::MessageSent(_) | Self::ReadMarkerUpdated(_) => false,
            Self::RoomViewUpdated(_) | Self::ReadStatusChanged(_) => true,
        }
    }
}

/// Log record envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Record metadata.
    pub metadata: EventMetadata,
    /// Record payload.
    pub kind: ChatEventKind,
}

impl EventEnvelope {
    /// Wraps `kind` in fresh metadata.
    #[must_use]
    pub fn new(kind: ChatEventKind, correlation_id: Uuid, occurred_at: DateTime<Utc>) -> Self {
        Self {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                room_id: kind.room_id(),
                correlation_id,
                occurred_at,
            },
            kind,
        }
    }

    /// Schema tag of the payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    /// Partition key.
    #[must_use]
    pub fn room_id(&self) -> RoomId {
        self.metadata.room_id
    }
}
