//! Pure projection rules. Each returns whether it changed anything, so the
//! caller can skip writes and derived events on redelivery.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use parley_core::event::{MessageSent, RoomCreated};
use parley_core::ids::UserId;
use parley_core::model::{ConversationView, LastMessage, MessageRecord, ReadMarker};

/// Initial view for a newly created room. Nobody has unread messages yet.
#[must_use]
pub fn view_for_new_room(event: &RoomCreated) -> ConversationView {
    let mut participant_ids: Vec<UserId> = Vec::with_capacity(event.participants.len());
    for participant in &event.participants {
        if !participant_ids.contains(&participant.id) {
            participant_ids.push(participant.id);
        }
    }

    ConversationView {
        room_id: event.room_id,
        room_name: event.room_name.clone(),
        participant_ids,
        unread: BTreeMap::new(),
        last_message: None,
        created_at: event.created_at,
        updated_at: event.created_at,
    }
}

/// History entry for a sent message.
#[must_use]
pub fn message_record(event: &MessageSent) -> MessageRecord {
    MessageRecord {
        message_id: event.message_id,
        room_id: event.room_id,
        sender_id: event.sender_id,
        sender_display_name: event.sender_display_name.clone(),
        content: event.content.clone(),
        sent_at: event.sent_at,
    }
}

/// Whether `event` is newer than what `view` already reflects.
///
/// A later `sent_at` always advances. An equal `sent_at` advances only when
/// the message id is higher than the current last message, which makes a
/// redelivery of the current last message a no-op.
#[must_use]
pub fn message_advances_view(view: &ConversationView, event: &MessageSent) -> bool {
    match event.sent_at.cmp(&view.updated_at) {
        Ordering::Greater => true,
        Ordering::Equal => view
            .last_message
            .as_ref()
            .is_none_or(|last| last.message_id < event.message_id),
        Ordering::Less => false,
    }
}

/// Moves the view to `event` and marks every participant except the sender
/// unread. Returns `false`, leaving the view untouched, when the event does
/// not advance it.
pub fn apply_message(view: &mut ConversationView, event: &MessageSent) -> bool {
    if !message_advances_view(view, event) {
        return false;
    }

    view.last_message = Some(LastMessage {
        message_id: event.message_id,
        sender_id: event.sender_id,
        content: event.content.clone(),
        sent_at: event.sent_at,
    });
    view.updated_at = event.sent_at;
    for participant in &view.participant_ids {
        if *participant != event.sender_id {
            view.unread.insert(*participant, true);
        }
    }
    true
}

/// Clears the unread flag of the marker's owner. Returns `true` only when the
/// flag actually flipped from unread to read.
pub fn clear_unread(view: &mut ConversationView, marker: &ReadMarker) -> bool {
    match view.unread.get_mut(&marker.customer_id) {
        Some(unread) if *unread => {
            *unread = false;
            true
        }
        _ => false,
    }
}
