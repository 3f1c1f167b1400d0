//! SQLite consultation repository implementation.
//!
//! Status transitions are conditional updates (`WHERE id = ? AND status = ?`),
//! so concurrent `end` calls race on the single writer connection and exactly
//! one of them changes a row.

use astroconsult_core::repository::consultation::ConsultationRepository;
use astroconsult_types::consultation::{
    Consultation, ConsultationId, ConsultationStatus, ConsultationType,
};
use astroconsult_types::error::RepositoryError;
use astroconsult_types::user::UserId;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::user::parse_decimal;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `ConsultationRepository`.
pub struct SqliteConsultationRepository {
    pool: DatabasePool,
}

impl SqliteConsultationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ConsultationRow {
    id: String,
    customer_id: String,
    astrologer_id: String,
    consultation_type: String,
    status: String,
    started_at: Option<String>,
    ended_at: Option<String>,
    duration_minutes: i64,
    rate_per_minute: String,
    total_cost: Option<String>,
    free_minutes_used: i64,
    created_at: String,
    updated_at: String,
}

impl ConsultationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            astrologer_id: row.try_get("astrologer_id")?,
            consultation_type: row.try_get("consultation_type")?,
            status: row.try_get("status")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
            duration_minutes: row.try_get("duration_minutes")?,
            rate_per_minute: row.try_get("rate_per_minute")?,
            total_cost: row.try_get("total_cost")?,
            free_minutes_used: row.try_get("free_minutes_used")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_consultation(self) -> Result<Consultation, RepositoryError> {
        let parse_uuid = |s: &str, what: &str| {
            Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {what}: {e}")))
        };
        let consultation_type: ConsultationType = self
            .consultation_type
            .parse()
            .map_err(RepositoryError::Query)?;
        let status: ConsultationStatus = self.status.parse().map_err(RepositoryError::Query)?;

        Ok(Consultation {
            id: ConsultationId::from_uuid(parse_uuid(&self.id, "consultation id")?),
            customer_id: UserId::from_uuid(parse_uuid(&self.customer_id, "customer_id")?),
            astrologer_id: UserId::from_uuid(parse_uuid(&self.astrologer_id, "astrologer_id")?),
            consultation_type,
            status,
            started_at: self.started_at.as_deref().map(parse_datetime).transpose()?,
            ended_at: self.ended_at.as_deref().map(parse_datetime).transpose()?,
            duration_minutes: self.duration_minutes.max(0) as u32,
            rate_per_minute: parse_decimal(&self.rate_per_minute)?,
            total_cost: self.total_cost.as_deref().map(parse_decimal).transpose()?,
            free_minutes_used: self.free_minutes_used.max(0) as u32,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

impl ConsultationRepository for SqliteConsultationRepository {
    async fn create(
        &self,
        consultation: &Consultation,
        first_consultation_free_minutes: u32,
    ) -> Result<Consultation, RepositoryError> {
        let row = sqlx::query(
            r#"INSERT INTO consultations (id, customer_id, astrologer_id, consultation_type, status, started_at, ended_at, duration_minutes, rate_per_minute, total_cost, free_minutes_used, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                       CASE WHEN EXISTS (SELECT 1 FROM consultations WHERE customer_id = ?) THEN 0 ELSE ? END,
                       ?, ?)
               RETURNING free_minutes_used"#,
        )
        .bind(consultation.id.to_string())
        .bind(consultation.customer_id.to_string())
        .bind(consultation.astrologer_id.to_string())
        .bind(consultation.consultation_type.to_string())
        .bind(consultation.status.to_string())
        .bind(consultation.started_at.as_ref().map(format_datetime))
        .bind(consultation.ended_at.as_ref().map(format_datetime))
        .bind(consultation.duration_minutes as i64)
        .bind(consultation.rate_per_minute.to_string())
        .bind(consultation.total_cost.map(|c| c.to_string()))
        .bind(consultation.customer_id.to_string())
        .bind(first_consultation_free_minutes as i64)
        .bind(format_datetime(&consultation.created_at))
        .bind(format_datetime(&consultation.updated_at))
        .fetch_one(&self.pool.writer)
        .await
        .map_err(query_error)?;

        let free_minutes_used: i64 = row.try_get("free_minutes_used").map_err(query_error)?;
        Ok(Consultation {
            free_minutes_used: free_minutes_used.max(0) as u32,
            ..consultation.clone()
        })
    }

    async fn get(&self, id: &ConsultationId) -> Result<Option<Consultation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM consultations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let c = ConsultationRow::from_row(&row).map_err(query_error)?;
                Ok(Some(c.into_consultation()?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Consultation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM consultations
             WHERE customer_id = ?1 OR astrologer_id = ?1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| {
                ConsultationRow::from_row(row)
                    .map_err(query_error)?
                    .into_consultation()
            })
            .collect()
    }

    async fn compare_and_set(
        &self,
        updated: &Consultation,
        expected: ConsultationStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE consultations
             SET status = ?, started_at = ?, ended_at = ?, duration_minutes = ?, total_cost = ?, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(updated.status.to_string())
        .bind(updated.started_at.as_ref().map(format_datetime))
        .bind(updated.ended_at.as_ref().map(format_datetime))
        .bind(updated.duration_minutes as i64)
        .bind(updated.total_cost.map(|c| c.to_string()))
        .bind(format_datetime(&updated.updated_at))
        .bind(updated.id.to_string())
        .bind(expected.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(result.rows_affected() == 1)
    }
}
