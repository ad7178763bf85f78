//! Read-model documents maintained by the projection engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, RoomId, UserId};

/// Summary of the most recent message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// One document per room. `updated_at` is monotonic and doubles as the
/// "most recently active room" sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub room_id: RoomId,
    pub room_name: String,
    /// Ordered set: insertion order of the `RoomCreated` participant list.
    pub participant_ids: Vec<UserId>,
    pub unread: BTreeMap<UserId, bool>,
    pub last_message: Option<LastMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationView {
    /// Whether `user_id` is listed as a participant.
    #[must_use]
    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.participant_ids.contains(&user_id)
    }
}

/// Append-only message history entry, keyed by `message_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub message_id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_display_name: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Last message a customer has read in a room. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMarker {
    pub room_id: RoomId,
    pub customer_id: UserId,
    pub last_read_message_id: MessageId,
}

impl ReadMarker {
    /// Monotonic guard: a candidate is accepted only if it strictly advances
    /// the stored marker.
    #[must_use]
    pub fn accepts(current: Option<&Self>, candidate: MessageId) -> bool {
        current.is_none_or(|marker| candidate > marker.last_read_message_id)
    }
}
