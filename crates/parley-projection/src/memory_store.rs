//! In-memory implementation of the `ReadModelStore` trait.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use parley_core::error::DomainError;
use parley_core::ids::{MessageId, RoomId, UserId};
use parley_core::model::{ConversationView, MessageRecord, ReadMarker};

use crate::domain::read_model::ReadModelStore;

#[derive(Debug, Default)]
struct Documents {
    views: HashMap<RoomId, ConversationView>,
    messages: BTreeMap<(RoomId, MessageId), MessageRecord>,
    markers: BTreeMap<(RoomId, UserId), ReadMarker>,
}

/// Process-local document store.
#[derive(Debug, Default)]
pub struct InMemoryReadModelStore {
    documents: Mutex<Documents>,
}

impl InMemoryReadModelStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of message records in a room.
    #[must_use]
    pub fn message_count(&self, room_id: RoomId) -> usize {
        self.documents()
            .messages
            .range(room_range(room_id, MessageId(i64::MIN), MessageId(i64::MAX)))
            .count()
    }

    fn documents(&self) -> MutexGuard<'_, Documents> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn room_range(
    room_id: RoomId,
    from: MessageId,
    to: MessageId,
) -> std::ops::RangeInclusive<(RoomId, MessageId)> {
    (room_id, from)..=(room_id, to)
}

#[async_trait]
impl ReadModelStore for InMemoryReadModelStore {
    async fn find_view(&self, room_id: RoomId) -> Result<Option<ConversationView>, DomainError> {
        Ok(self.documents().views.get(&room_id).cloned())
    }

    async fn insert_view_if_absent(&self, view: ConversationView) -> Result<bool, DomainError> {
        let mut documents = self.documents();
        if documents.views.contains_key(&view.room_id) {
            return Ok(false);
        }
        documents.views.insert(view.room_id, view);
        Ok(true)
    }

    async fn replace_view(&self, view: ConversationView) -> Result<(), DomainError> {
        self.documents().views.insert(view.room_id, view);
        Ok(())
    }

    async fn views_for_participant(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationView>, DomainError> {
        let mut views: Vec<ConversationView> = self
            .documents()
            .views
            .values()
            .filter(|view| view.has_participant(user_id))
            .cloned()
            .collect();
        views.sort_by_key(|view| Reverse((view.updated_at, view.room_id)));
        Ok(views)
    }

    async fn insert_message_if_absent(&self, record: MessageRecord) -> Result<bool, DomainError> {
        let mut documents = self.documents();
        let key = (record.room_id, record.message_id);
        if documents.messages.contains_key(&key) {
            return Ok(false);
        }
        documents.messages.insert(key, record);
        Ok(true)
    }

    async fn latest_messages(
        &self,
        room_id: RoomId,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, DomainError> {
        Ok(self
            .documents()
            .messages
            .range(room_range(room_id, MessageId(i64::MIN), MessageId(i64::MAX)))
            .rev()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn messages_before(
        &self,
        room_id: RoomId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, DomainError> {
        Ok(self
            .documents()
            .messages
            .range((room_id, MessageId(i64::MIN))..(room_id, before))
            .rev()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn advance_read_marker(&self, marker: ReadMarker) -> Result<bool, DomainError> {
        let mut documents = self.documents();
        let key = (marker.room_id, marker.customer_id);
        if !ReadMarker::accepts(documents.markers.get(&key), marker.last_read_message_id) {
            return Ok(false);
        }
        documents.markers.insert(key, marker);
        Ok(true)
    }

    async fn read_markers(&self, room_id: RoomId) -> Result<Vec<ReadMarker>, DomainError> {
        Ok(self
            .documents()
            .markers
            .range((room_id, UserId(i64::MIN))..=(room_id, UserId(i64::MAX)))
            .map(|(_, marker)| *marker)
            .collect())
    }
}
