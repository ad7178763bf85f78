//! In-memory implementation of the `ChatRepository` trait.
//!
//! Mirrors the relational schema closely enough to stand in for PostgreSQL
//! in tests and single-process deployments: ids come from per-table
//! sequences and a room is inserted together with its participant rows.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use parley_core::error::DomainError;
use parley_core::ids::{MessageId, RoomId, UserId};
use parley_core::repository::{ChatRepository, NewMessage, NewRoom, StoredMessage};

#[derive(Debug, Clone)]
struct RoomRow {
    room_name: String,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Tables {
    next_room_id: i64,
    next_message_id: i64,
    rooms: HashMap<RoomId, RoomRow>,
    participants: HashMap<(RoomId, UserId), Option<MessageId>>,
    messages: Vec<StoredMessage>,
}

/// Process-local write store.
#[derive(Debug)]
pub struct InMemoryChatRepository {
    tables: Mutex<Tables>,
}

impl InMemoryChatRepository {
    /// Creates an empty store whose sequences start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sequences(1, 1)
    }

    /// Creates an empty store whose room and message sequences start at the
    /// given values.
    #[must_use]
    pub fn with_sequences(first_room_id: i64, first_message_id: i64) -> Self {
        Self {
            tables: Mutex::new(Tables {
                next_room_id: first_room_id,
                next_message_id: first_message_id,
                rooms: HashMap::new(),
                participants: HashMap::new(),
                messages: Vec::new(),
            }),
        }
    }

    /// Snapshot of every persisted message row, in insertion order.
    #[must_use]
    pub fn messages(&self) -> Vec<StoredMessage> {
        self.tables().messages.clone()
    }

    /// Participant ids of a room, ascending.
    #[must_use]
    pub fn participants(&self, room_id: RoomId) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self
            .tables()
            .participants
            .keys()
            .filter(|(room, _)| *room == room_id)
            .map(|(_, user)| *user)
            .collect();
        ids.sort();
        ids
    }

    /// Stored last-read message id of a participant.
    #[must_use]
    pub fn last_read_message_id(&self, room_id: RoomId, customer_id: UserId) -> Option<MessageId> {
        self.tables()
            .participants
            .get(&(room_id, customer_id))
            .copied()
            .flatten()
    }

    /// Name and creator of a room.
    #[must_use]
    pub fn room(&self, room_id: RoomId) -> Option<(String, UserId, DateTime<Utc>)> {
        self.tables()
            .rooms
            .get(&room_id)
            .map(|row| (row.room_name.clone(), row.created_by, row.created_at))
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryChatRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn room_exists(&self, room_id: RoomId) -> Result<bool, DomainError> {
        Ok(self.tables().rooms.contains_key(&room_id))
    }

    async fn is_participant(&self, room_id: RoomId, user_id: UserId) -> Result<bool, DomainError> {
        Ok(self.tables().participants.contains_key(&(room_id, user_id)))
    }

    async fn insert_message(&self, message: NewMessage) -> Result<StoredMessage, DomainError> {
        let mut tables = self.tables();
        if !tables.rooms.contains_key(&message.room_id) {
            return Err(DomainError::Infrastructure(format!(
                "write store: room {} violates messages.room_id foreign key",
                message.room_id
            )));
        }

        let stored = StoredMessage {
            message_id: MessageId(tables.next_message_id),
            room_id: message.room_id,
            sender_id: message.sender_id,
            content: message.content,
            sent_at: message.sent_at,
        };
        tables.next_message_id += 1;
        tables.messages.push(stored.clone());
        Ok(stored)
    }

    async fn insert_room(&self, room: NewRoom) -> Result<RoomId, DomainError> {
        let mut tables = self.tables();
        let room_id = RoomId(tables.next_room_id);
        tables.next_room_id += 1;

        tables.rooms.insert(
            room_id,
            RoomRow {
                room_name: room.room_name,
                created_by: room.created_by,
                created_at: room.created_at,
            },
        );
        for participant in room.participant_ids {
            tables.participants.insert((room_id, participant), None);
        }
        Ok(room_id)
    }

    async fn update_read_marker(
        &self,
        room_id: RoomId,
        customer_id: UserId,
        message_id: MessageId,
    ) -> Result<bool, DomainError> {
        let mut tables = self.tables();
        match tables.participants.get_mut(&(room_id, customer_id)) {
            Some(last_read) if last_read.is_none_or(|current| current < message_id) => {
                *last_read = Some(message_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
