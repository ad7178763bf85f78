//! Builders for the events the Command Processor emits.

use chrono::{DateTime, Utc};
use parley_core::event::{MessageSent, ParticipantDescriptor, ReadMarkerUpdated, RoomCreated};
use parley_core::ids::{RoomId, UserId};
use parley_core::repository::StoredMessage;

use crate::domain::commands::{CreateRoom, UpdateReadMarker};

/// `MessageSent` for a persisted message row.
#[must_use]
pub fn message_sent(stored: StoredMessage, sender_display_name: String) -> MessageSent {
    MessageSent {
        message_id: stored.message_id,
        room_id: stored.room_id,
        sender_id: stored.sender_id,
        sender_display_name,
        content: stored.content,
        sent_at: stored.sent_at,
    }
}

/// `RoomCreated` with one descriptor per participant, in participant order.
#[must_use]
pub fn room_created(
    command: &CreateRoom,
    room_id: RoomId,
    created_at: DateTime<Utc>,
    participants: Vec<(UserId, String)>,
) -> RoomCreated {
    RoomCreated {
        room_id,
        room_name: command.room_name.clone(),
        created_by: command.creator_id,
        created_at,
        participants: participants
            .into_iter()
            .map(|(id, display_name)| ParticipantDescriptor {
                id,
                display_name,
                joined_at: created_at,
            })
            .collect(),
    }
}

/// `ReadMarkerUpdated` echoing the requested marker.
#[must_use]
pub fn read_marker_updated(command: &UpdateReadMarker) -> ReadMarkerUpdated {
    ReadMarkerUpdated {
        room_id: command.room_id,
        customer_id: command.customer_id,
        last_read_message_id: command.message_id,
    }
}
