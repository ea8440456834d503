use async_trait::async_trait;
use chrono::{DateTime, Utc};
use matchday_core::{ConversationRecord, ConversationStore, Phase, StoreError};
use sqlx::{sqlite::SqliteRow, Row};

use crate::DbPool;

/// SQLite-backed conversation store. One row per user; writes are atomic
/// upserts so a crash can never leave a half-written record.
pub struct SqlConversationStore {
    pool: DbPool,
}

impl SqlConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for SqlConversationStore {
    async fn find(&self, user_id: &str) -> Result<Option<ConversationRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, phase, context, updated_at FROM conversations WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(decode_row).transpose()
    }

    async fn find_by_poll_message(
        &self,
        message_id: &str,
    ) -> Result<Option<ConversationRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, phase, context, updated_at FROM conversations \
             WHERE poll_message_id = ?",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(decode_row).transpose()
    }

    async fn upsert(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        let context = serde_json::to_string(&record.context)
            .map_err(|error| StoreError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO conversations (user_id, phase, context, poll_message_id, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
                 phase = excluded.phase, \
                 context = excluded.context, \
                 poll_message_id = excluded.poll_message_id, \
                 updated_at = excluded.updated_at",
        )
        .bind(&record.user_id)
        .bind(record.phase.as_str())
        .bind(context)
        .bind(record.context.poll_message_id.as_deref())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }
}

fn backend(error: sqlx::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

fn decode_row(row: SqliteRow) -> Result<ConversationRecord, StoreError> {
    let user_id: String =
        row.try_get("user_id").map_err(|error| StoreError::Decode(error.to_string()))?;
    let phase: String =
        row.try_get("phase").map_err(|error| StoreError::Decode(error.to_string()))?;
    let context: String =
        row.try_get("context").map_err(|error| StoreError::Decode(error.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|error| StoreError::Decode(error.to_string()))?;

    Ok(ConversationRecord {
        user_id,
        phase: phase.parse::<Phase>().map_err(|error| StoreError::Decode(error.to_string()))?,
        context: serde_json::from_str(&context)
            .map_err(|error| StoreError::Decode(error.to_string()))?,
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|error| StoreError::Decode(error.to_string()))?
            .with_timezone(&Utc),
    })
}
