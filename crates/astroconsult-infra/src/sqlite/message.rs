//! SQLite chat message repository implementation.

use astroconsult_core::repository::message::MessageRepository;
use astroconsult_types::chat::ChatMessage;
use astroconsult_types::consultation::ConsultationId;
use astroconsult_types::error::RepositoryError;
use astroconsult_types::user::UserId;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ChatMessageRow {
    id: String,
    consultation_id: String,
    sender_id: String,
    message: String,
    is_read: bool,
    created_at: String,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            consultation_id: row.try_get("consultation_id")?,
            sender_id: row.try_get("sender_id")?,
            message: row.try_get("message")?,
            is_read: row.try_get("is_read")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let consultation_id = Uuid::parse_str(&self.consultation_id)
            .map_err(|e| RepositoryError::Query(format!("invalid consultation_id: {e}")))?;
        let sender_id = Uuid::parse_str(&self.sender_id)
            .map_err(|e| RepositoryError::Query(format!("invalid sender_id: {e}")))?;

        Ok(ChatMessage {
            id,
            consultation_id: ConsultationId::from_uuid(consultation_id),
            sender_id: UserId::from_uuid(sender_id),
            message: self.message,
            is_read: self.is_read,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl MessageRepository for SqliteMessageRepository {
    async fn append(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        // Existence check and insert in one statement.
        let result = sqlx::query(
            "INSERT INTO chat_messages (id, consultation_id, sender_id, message, is_read, created_at)
             SELECT ?, ?, ?, ?, ?, ?
             WHERE EXISTS (SELECT 1 FROM consultations WHERE id = ?)",
        )
        .bind(message.id.to_string())
        .bind(message.consultation_id.to_string())
        .bind(message.sender_id.to_string())
        .bind(&message.message)
        .bind(message.is_read)
        .bind(format_datetime(&message.created_at))
        .bind(message.consultation_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, consultation_id: &ConsultationId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_messages WHERE consultation_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(consultation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| ChatMessageRow::from_row(row).map_err(query_error)?.into_message())
            .collect()
    }
}
