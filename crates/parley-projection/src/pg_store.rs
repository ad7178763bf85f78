//! `PostgreSQL` implementation of the `ReadModelStore` trait.
//!
//! Conversation views are kept as JSONB documents next to the columns the
//! room-list query filters and sorts on. Message history and read markers
//! are plain rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use parley_core::error::DomainError;
use parley_core::ids::{MessageId, RoomId, UserId};
use parley_core::model::{ConversationView, MessageRecord, ReadMarker};

use crate::domain::read_model::ReadModelStore;

type MessageRow = (i64, i64, i64, String, String, DateTime<Utc>);

/// PostgreSQL-backed document store.
#[derive(Debug, Clone)]
pub struct PgReadModelStore {
    pool: PgPool,
}

impl PgReadModelStore {
    /// Creates a new `PgReadModelStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("read model store: {err}"))
}

fn participant_column(view: &ConversationView) -> Vec<i64> {
    view.participant_ids.iter().map(|id| id.get()).collect()
}

fn page_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn message_record(row: MessageRow) -> MessageRecord {
    let (message_id, room_id, sender_id, sender_display_name, content, sent_at) = row;
    MessageRecord {
        message_id: MessageId(message_id),
        room_id: RoomId(room_id),
        sender_id: UserId(sender_id),
        sender_display_name,
        content,
        sent_at,
    }
}

#[async_trait]
impl ReadModelStore for PgReadModelStore {
    async fn find_view(&self, room_id: RoomId) -> Result<Option<ConversationView>, DomainError> {
        let document = sqlx::query_scalar::<_, Json<ConversationView>>(
            "SELECT document FROM conversation_views WHERE room_id = $1",
        )
        .bind(room_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(document.map(|Json(view)| view))
    }

    async fn insert_view_if_absent(&self, view: ConversationView) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "INSERT INTO conversation_views (room_id, participant_ids, updated_at, document) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (room_id) DO NOTHING",
        )
        .bind(view.room_id.get())
        .bind(participant_column(&view))
        .bind(view.updated_at)
        .bind(Json(&view))
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(result.rows_affected() > 0)
    }

    async fn replace_view(&self, view: ConversationView) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO conversation_views (room_id, participant_ids, updated_at, document) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (room_id) DO UPDATE SET participant_ids = EXCLUDED.participant_ids, \
             updated_at = EXCLUDED.updated_at, document = EXCLUDED.document",
        )
        .bind(view.room_id.get())
        .bind(participant_column(&view))
        .bind(view.updated_at)
        .bind(Json(&view))
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(())
    }

    async fn views_for_participant(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationView>, DomainError> {
        let documents = sqlx::query_scalar::<_, Json<ConversationView>>(
            "SELECT document FROM conversation_views \
             WHERE participant_ids @> ARRAY[$1]::BIGINT[] \
             ORDER BY updated_at DESC, room_id DESC",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(documents.into_iter().map(|Json(view)| view).collect())
    }

    async fn insert_message_if_absent(&self, record: MessageRecord) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "INSERT INTO message_history \
             (room_id, message_id, sender_id, sender_display_name, content, sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (room_id, message_id) DO NOTHING",
        )
        .bind(record.room_id.get())
        .bind(record.message_id.get())
        .bind(record.sender_id.get())
        .bind(&record.sender_display_name)
        .bind(&record.content)
        .bind(record.sent_at)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(result.rows_affected() > 0)
    }

    async fn latest_messages(
        &self,
        room_id: RoomId,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, DomainError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT message_id, room_id, sender_id, sender_display_name, content, sent_at \
             FROM message_history WHERE room_id = $1 \
             ORDER BY message_id DESC LIMIT $2",
        )
        .bind(room_id.get())
        .bind(page_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(rows.into_iter().map(message_record).collect())
    }

    async fn messages_before(
        &self,
        room_id: RoomId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, DomainError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT message_id, room_id, sender_id, sender_display_name, content, sent_at \
             FROM message_history WHERE room_id = $1 AND message_id < $2 \
             ORDER BY message_id DESC LIMIT $3",
        )
        .bind(room_id.get())
        .bind(before.get())
        .bind(page_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(rows.into_iter().map(message_record).collect())
    }

    async fn advance_read_marker(&self, marker: ReadMarker) -> Result<bool, DomainError> {
        // The conflict branch only updates when the stored id is lower, so a
        // stale or repeated marker affects no rows.
        let result = sqlx::query(
            "INSERT INTO read_markers (room_id, customer_id, last_read_message_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (room_id, customer_id) DO UPDATE \
             SET last_read_message_id = EXCLUDED.last_read_message_id \
             WHERE read_markers.last_read_message_id < EXCLUDED.last_read_message_id",
        )
        .bind(marker.room_id.get())
        .bind(marker.customer_id.get())
        .bind(marker.last_read_message_id.get())
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(result.rows_affected() > 0)
    }

    async fn read_markers(&self, room_id: RoomId) -> Result<Vec<ReadMarker>, DomainError> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT customer_id, last_read_message_id FROM read_markers \
             WHERE room_id = $1 ORDER BY customer_id",
        )
        .bind(room_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(rows
            .into_iter()
            .map(|(customer_id, last_read)| ReadMarker {
                room_id,
                customer_id: UserId(customer_id),
                last_read_message_id: MessageId(last_read),
            })
            .collect())
    }
}
