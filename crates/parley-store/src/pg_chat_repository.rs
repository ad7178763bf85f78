//! `PostgreSQL` implementation of the `ChatRepository` trait.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use parley_core::error::DomainError;
use parley_core::ids::{MessageId, RoomId, UserId};
use parley_core::repository::{ChatRepository, NewMessage, NewRoom, StoredMessage};

/// PostgreSQL-backed write store.
#[derive(Debug, Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    /// Creates a new `PgChatRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("write store: {err}"))
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn room_exists(&self, room_id: RoomId) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM rooms WHERE room_id = $1)")
            .bind(room_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(infrastructure)
    }

    async fn is_participant(&self, room_id: RoomId, user_id: UserId) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM room_participants WHERE room_id = $1 AND customer_id = $2)",
        )
        .bind(room_id.get())
        .bind(user_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(infrastructure)
    }

    async fn insert_message(&self, message: NewMessage) -> Result<StoredMessage, DomainError> {
        let message_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO messages (room_id, customer_id, content, sent_at) \
             VALUES ($1, $2, $3, $4) RETURNING message_id",
        )
        .bind(message.room_id.get())
        .bind(message.sender_id.get())
        .bind(&message.content)
        .bind(message.sent_at)
        .fetch_one(&self.pool)
        .await
        .map_err(infrastructure)?;

        debug!(message_id, room_id = %message.room_id, "message row inserted");

        Ok(StoredMessage {
            message_id: MessageId(message_id),
            room_id: message.room_id,
            sender_id: message.sender_id,
            content: message.content,
            sent_at: message.sent_at,
        })
    }

    async fn insert_room(&self, room: NewRoom) -> Result<RoomId, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        let room_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO rooms (room_name, created_by, created_at) VALUES ($1, $2, $3) \
             RETURNING room_id",
        )
        .bind(&room.room_name)
        .bind(room.created_by.get())
        .bind(room.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(infrastructure)?;

        for participant in &room.participant_ids {
            sqlx::query(
                "INSERT INTO room_participants (room_id, customer_id, joined_at) \
                 VALUES ($1, $2, $3)",
            )
            .bind(room_id)
            .bind(participant.get())
            .bind(room.created_at)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;
        }

        tx.commit().await.map_err(infrastructure)?;

        debug!(room_id, participants = room.participant_ids.len(), "room rows inserted");
        Ok(RoomId(room_id))
    }

    async fn update_read_marker(
        &self,
        room_id: RoomId,
        customer_id: UserId,
        message_id: MessageId,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE room_participants SET last_read_message_id = $3 \
             WHERE room_id = $1 AND customer_id = $2 \
             AND (last_read_message_id IS NULL OR last_read_message_id < $3)",
        )
        .bind(room_id.get())
        .bind(customer_id.get())
        .bind(message_id.get())
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(result.rows_affected() > 0)
    }
}
