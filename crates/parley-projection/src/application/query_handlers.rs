//! Query handlers for the Projection Engine.
//!
//! Room-scoped queries are answered only for participants of the room.

use parley_core::error::DomainError;
use parley_core::ids::{MessageId, RoomId, UserId};
use parley_core::model::{ConversationView, MessageRecord, ReadMarker};

use crate::domain::read_model::ReadModelStore;

/// Messages returned per history page.
pub const PAGE_SIZE: usize = 20;

/// Every conversation `user_id` participates in, most recently active first.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the read-model store fails.
pub async fn get_rooms_for_user(
    user_id: UserId,
    store: &dyn ReadModelStore,
) -> Result<Vec<ConversationView>, DomainError> {
    store.views_for_participant(user_id).await
}

/// Whether `user_id` is listed in the view of `room_id`. Unknown rooms have
/// no members.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the read-model store fails.
pub async fn is_room_member(
    room_id: RoomId,
    user_id: UserId,
    store: &dyn ReadModelStore,
) -> Result<bool, DomainError> {
    Ok(store
        .find_view(room_id)
        .await?
        .is_some_and(|view| view.has_participant(user_id)))
}

/// The view of a room, visible to its participants only.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown room and
/// `DomainError::Forbidden` when `requester` is not a participant.
pub async fn get_room_for_participant(
    room_id: RoomId,
    requester: UserId,
    store: &dyn ReadModelStore,
) -> Result<ConversationView, DomainError> {
    let view = store
        .find_view(room_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("room {room_id}")))?;
    if !view.has_participant(requester) {
        return Err(DomainError::Forbidden(format!(
            "customer {requester} is not a participant of room {room_id}"
        )));
    }
    Ok(view)
}

/// The newest page of a room's history, newest first.
///
/// # Errors
///
/// See [`get_room_for_participant`].
pub async fn get_latest_messages(
    room_id: RoomId,
    requester: UserId,
    store: &dyn ReadModelStore,
) -> Result<Vec<MessageRecord>, DomainError> {
    get_room_for_participant(room_id, requester, store).await?;
    store.latest_messages(room_id, PAGE_SIZE).await
}

/// The page of history strictly older than `before`, newest first.
///
/// # Errors
///
/// See [`get_room_for_participant`].
pub async fn get_messages_before(
    room_id: RoomId,
    before: MessageId,
    requester: UserId,
    store: &dyn ReadModelStore,
) -> Result<Vec<MessageRecord>, DomainError> {
    get_room_for_participant(room_id, requester, store).await?;
    store.messages_before(room_id, before, PAGE_SIZE).await
}

/// All read markers of a room.
///
/// # Errors
///
/// See [`get_room_for_participant`].
pub async fn get_read_markers(
    room_id: RoomId,
    requester: UserId,
    store: &dyn ReadModelStore,
) -> Result<Vec<ReadMarker>, DomainError> {
    get_room_for_participant(room_id, requester, store).await?;
    store.read_markers(room_id).await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use parley_core::error::DomainError;
    use parley_core::ids::{MessageId, RoomId, UserId};
    use parley_core::model::{ConversationView, MessageRecord};

    use super::*;
    use crate::memory_store::InMemoryReadModelStore;

    async fn seeded_store() -> InMemoryReadModelStore {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let store = InMemoryReadModelStore::new();
        store
            .insert_view_if_absent(ConversationView {
                room_id: RoomId(100),
                room_name: "Team".to_owned(),
                participant_ids: vec![UserId(1), UserId(2)],
                unread: BTreeMap::new(),
                last_message: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        for id in 1000..1030 {
            store
                .insert_message_if_absent(MessageRecord {
                    message_id: MessageId(id),
                    room_id: RoomId(100),
                    sender_id: UserId(1),
                    sender_display_name: "Alice".to_owned(),
                    content: format!("m{id}"),
                    sent_at: now,
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_history_pages_through_twenty_at_a_time() {
        // Arrange
        let store = seeded_store().await;

        // Act
        let latest = get_latest_messages(RoomId(100), UserId(2), &store)
            .await
            .unwrap();
        let cursor = latest.last().unwrap().message_id;
        let older = get_messages_before(RoomId(100), cursor, UserId(2), &store)
            .await
            .unwrap();

        // Assert
        assert_eq!(latest.len(), PAGE_SIZE);
        assert_eq!(latest[0].message_id, MessageId(1029));
        assert_eq!(cursor, MessageId(1010));
        assert_eq!(older.len(), 10);
        assert_eq!(older[0].message_id, MessageId(1009));
    }

    #[tokio::test]
    async fn test_room_queries_require_participation() {
        let store = seeded_store().await;

        let outsider = get_latest_messages(RoomId(100), UserId(9), &store).await;
        let unknown = get_read_markers(RoomId(404), UserId(1), &store).await;

        assert!(matches!(outsider, Err(DomainError::Forbidden(_))));
        assert!(matches!(unknown, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_is_room_member_reads_view_participants() {
        let store = seeded_store().await;

        assert!(is_room_member(RoomId(100), UserId(2), &store).await.unwrap());
        assert!(!is_room_member(RoomId(100), UserId(3), &store).await.unwrap());
        assert!(!is_room_member(RoomId(404), UserId(1), &store).await.unwrap());
    }
}
