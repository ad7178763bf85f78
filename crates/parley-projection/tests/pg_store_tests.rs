//! Integration tests for `PgReadModelStore`.
//!
//! These need a PostgreSQL server reachable through `DATABASE_URL`; run them
//! with `cargo test -- --ignored`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parley_core::ids::{MessageId, RoomId, UserId};
use parley_core::model::{ConversationView, LastMessage, MessageRecord, ReadMarker};
use parley_projection::PgReadModelStore;
use parley_projection::domain::read_model::ReadModelStore;
use sqlx::PgPool;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

fn view(room: i64, members: &[i64], minutes: i64) -> ConversationView {
    ConversationView {
        room_id: RoomId(room),
        room_name: format!("room {room}"),
        participant_ids: members.iter().copied().map(UserId).collect(),
        unread: BTreeMap::new(),
        last_message: None,
        created_at: base(),
        updated_at: base() + Duration::minutes(minutes),
    }
}

fn record(room: i64, id: i64) -> MessageRecord {
    MessageRecord {
        message_id: MessageId(id),
        room_id: RoomId(room),
        sender_id: UserId(1),
        sender_display_name: "Alice".to_string(),
        content: format!("m{id}"),
        sent_at: base(),
    }
}

// --- views ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_view_document_survives_replace(pool: PgPool) {
    let store = PgReadModelStore::new(pool);
    let mut team = view(100, &[1, 2, 3], 0);
    assert!(store.insert_view_if_absent(team.clone()).await.unwrap());
    assert!(!store.insert_view_if_absent(view(100, &[9], 0)).await.unwrap());

    team.unread.insert(UserId(2), true);
    team.last_message = Some(LastMessage {
        message_id: MessageId(1000),
        sender_id: UserId(1),
        content: "hi".to_string(),
        sent_at: base() + Duration::minutes(1),
    });
    team.updated_at = base() + Duration::minutes(1);
    store.replace_view(team.clone()).await.unwrap();

    assert_eq!(store.find_view(RoomId(100)).await.unwrap(), Some(team));
    assert_eq!(store.find_view(RoomId(404)).await.unwrap(), None);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_views_for_participant_orders_by_recent_activity(pool: PgPool) {
    let store = PgReadModelStore::new(pool);
    for (room, members, minutes) in [
        (1, &[1, 2][..], 0),
        (2, &[1, 3][..], 10),
        (3, &[2, 3][..], 5),
    ] {
        store.insert_view_if_absent(view(room, members, minutes)).await.unwrap();
    }

    let views = store.views_for_participant(UserId(1)).await.unwrap();

    let rooms: Vec<RoomId> = views.iter().map(|v| v.room_id).collect();
    assert_eq!(rooms, vec![RoomId(2), RoomId(1)]);
}

// --- history ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_message_pages_are_newest_first_and_deduplicated(pool: PgPool) {
    let store = PgReadModelStore::new(pool);
    for id in 1..=25 {
        assert!(store.insert_message_if_absent(record(100, id)).await.unwrap());
    }
    assert!(!store.insert_message_if_absent(record(100, 25)).await.unwrap());
    store.insert_message_if_absent(record(200, 99)).await.unwrap();

    let latest = store.latest_messages(RoomId(100), 20).await.unwrap();
    let older = store
        .messages_before(RoomId(100), MessageId(4), 20)
        .await
        .unwrap();

    assert_eq!(latest.len(), 20);
    assert_eq!(latest[0], record(100, 25));
    let older_ids: Vec<MessageId> = older.iter().map(|m| m.message_id).collect();
    assert_eq!(older_ids, vec![MessageId(3), MessageId(2), MessageId(1)]);
}

// --- read markers ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_read_marker_only_moves_forward(pool: PgPool) {
    let store = PgReadModelStore::new(pool);
    let marker = |customer, id| ReadMarker {
        room_id: RoomId(100),
        customer_id: UserId(customer),
        last_read_message_id: MessageId(id),
    };

    assert!(store.advance_read_marker(marker(2, 5)).await.unwrap());
    assert!(!store.advance_read_marker(marker(2, 3)).await.unwrap());
    assert!(!store.advance_read_marker(marker(2, 5)).await.unwrap());
    assert!(store.advance_read_marker(marker(2, 7)).await.unwrap());
    assert!(store.advance_read_marker(marker(1, 1)).await.unwrap());

    let markers = store.read_markers(RoomId(100)).await.unwrap();
    assert_eq!(markers, vec![marker(1, 1), marker(2, 7)]);
}
