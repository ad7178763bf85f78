//! Commands accepted by the Command Processor.

use parley_core::ids::{MessageId, RoomId, UserId};
use uuid::Uuid;

/// Command to post a message into a room.
#[derive(Debug, Clone)]
pub struct SubmitMessage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target room.
    pub room_id: RoomId,
    /// The authenticated sender.
    pub sender_id: UserId,
    /// Message text. Must not be empty.
    pub content: String,
}

/// Command to create a room with the creator and a list of invitees.
#[derive(Debug, Clone)]
pub struct CreateRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Display name of the room.
    pub room_name: String,
    /// The authenticated creator.
    pub creator_id: UserId,
    /// Invitees. Duplicates and the creator are ignored.
    pub target_ids: Vec<UserId>,
}

/// Command to record that a customer has read up to a message.
#[derive(Debug, Clone)]
pub struct UpdateReadMarker {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the marker belongs to.
    pub room_id: RoomId,
    /// The authenticated reader.
    pub customer_id: UserId,
    /// Last message the reader has seen.
    pub message_id: MessageId,
}

impl CreateRoom {
    /// Participant list for the new room: creator first, then each distinct
    /// invitee in request order.
    #[must_use]
    pub fn participant_ids(&self) -> Vec<UserId> {
        let mut participants = vec![self.creator_id];
        for target in &self.target_ids {
            if !participants.contains(target) {
                participants.push(*target);
            }
        }
        participants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_ids_puts_creator_first_and_drops_duplicates() {
        let command = CreateRoom {
            correlation_id: Uuid::new_v4(),
            room_name: "Team".to_owned(),
            creator_id: UserId(1),
            target_ids: vec![UserId(3), UserId(1), UserId(2), UserId(3)],
        };

        assert_eq!(
            command.participant_ids(),
            vec![UserId(1), UserId(3), UserId(2)]
        );
    }
}
