//! SQLite user and astrologer profile storage.
//!
//! Implements `AstrologerDirectory` from `astroconsult-core`. The seeding
//! methods (`create_user`, `upsert_astrologer_profile`, `set_online`) back the
//! operator CLI; production profiles are owned by the profile service.

use std::str::FromStr;

use astroconsult_core::repository::directory::AstrologerDirectory;
use astroconsult_types::error::RepositoryError;
use astroconsult_types::user::{AstrologerProfile, User, UserId, UserRole};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed user directory.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Insert a user. A duplicate phone number is a `Conflict`.
    pub async fn create_user(&self, user: &User) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO users (id, phone_number, first_name, last_name, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.phone_number)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.to_string())
        .bind(format_datetime(&user.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(user.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("phone '{}' already registered", user.phone_number)),
            ),
            Err(e) => Err(query_error(e)),
        }
    }

    pub async fn get(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|r| UserRow::from_row(&r).map_err(query_error)?.into_user())
            .transpose()
    }

    /// Look up a user by normalized phone number.
    pub async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE phone_number = ?")
            .bind(phone_number)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|r| UserRow::from_row(&r).map_err(query_error)?.into_user())
            .transpose()
    }

    /// Insert or replace the profile of an astrologer.
    pub async fn upsert_astrologer_profile(&self, profile: &AstrologerProfile) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO astrologer_profiles (user_id, display_name, chat_rate, call_rate, is_online, is_busy, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                chat_rate = excluded.chat_rate,
                call_rate = excluded.call_rate,
                is_online = excluded.is_online,
                is_busy = excluded.is_busy,
                updated_at = excluded.updated_at",
        )
        .bind(profile.user_id.to_string())
        .bind(&profile.display_name)
        .bind(profile.chat_rate.to_string())
        .bind(profile.call_rate.to_string())
        .bind(profile.is_online)
        .bind(profile.is_busy)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;
        Ok(())
    }

    /// Toggle availability. Returns `false` when the user has no profile.
    pub async fn set_online(&self, user_id: &UserId, is_online: bool) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE astrologer_profiles SET is_online = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(is_online)
        .bind(format_datetime(&Utc::now()))
        .bind(user_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        let changed = result.rows_affected() > 0;
        if changed {
            tracing::info!(user_id = %user_id, is_online, "astrologer availability changed");
        }
        Ok(changed)
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

pub(crate) struct UserRow {
    id: String,
    phone_number: String,
    first_name: String,
    last_name: String,
    role: String,
    created_at: String,
}

impl UserRow {
    pub(crate) fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            phone_number: row.try_get("phone_number")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            role: row.try_get("role")?,
            created_at: row.try_get("created_at")?,
        })
    }

    pub(crate) fn into_user(self) -> Result<User, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?;
        let role: UserRole = self.role.parse().map_err(RepositoryError::Query)?;

        Ok(User {
            id: UserId::from_uuid(id),
            phone_number: self.phone_number,
            first_name: self.first_name,
            last_name: self.last_name,
            role,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct ProfileRow {
    user_id: String,
    display_name: String,
    chat_rate: String,
    call_rate: String,
    is_online: bool,
    is_busy: bool,
}

impl ProfileRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            display_name: row.try_get("display_name")?,
            chat_rate: row.try_get("chat_rate")?,
            call_rate: row.try_get("call_rate")?,
            is_online: row.try_get("is_online")?,
            is_busy: row.try_get("is_busy")?,
        })
    }

    fn into_profile(self) -> Result<AstrologerProfile, RepositoryError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?;
        Ok(AstrologerProfile {
            user_id: UserId::from_uuid(user_id),
            display_name: self.display_name,
            chat_rate: parse_decimal(&self.chat_rate)?,
            call_rate: parse_decimal(&self.call_rate)?,
            is_online: self.is_online,
            is_busy: self.is_busy,
        })
    }
}

pub(crate) fn parse_decimal(s: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(s).map_err(|e| RepositoryError::Query(format!("invalid decimal '{s}': {e}")))
}

impl AstrologerDirectory for SqliteUserRepository {
    async fn find_astrologer(&self, user_id: &UserId) -> Result<Option<AstrologerProfile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT p.* FROM astrologer_profiles p
             JOIN users u ON u.id = p.user_id
             WHERE p.user_id = ? AND u.role = 'astrologer'",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        row.map(|r| ProfileRow::from_row(&r).map_err(query_error)?.into_profile())
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_support::{make_user, seed_pair, test_pool};

    #[tokio::test]
    async fn test_create_and_find_by_phone() {
        let pool = test_pool().await;
        let repo = SqliteUserRepository::new(pool);
        let user = make_user("919811111111", "Meera", UserRole::Customer);

        repo.create_user(&user).await.unwrap();

        let found = repo.find_by_phone("919811111111").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.first_name, "Meera");
        assert_eq!(found.role, UserRole::Customer);
        assert_eq!(repo.get(&user.id).await.unwrap().unwrap().phone_number, "919811111111");
        assert!(repo.find_by_phone("910000000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_phone_conflicts() {
        let pool = test_pool().await;
        let repo = SqliteUserRepository::new(pool);
        repo.create_user(&make_user("919822222222", "A", UserRole::Customer))
            .await
            .unwrap();
        let err = repo
            .create_user(&make_user("919822222222", "B", UserRole::Customer))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_find_astrologer_reads_rates_exactly() {
        let pool = test_pool().await;
        let (customer, astrologer) = seed_pair(&pool).await;
        let repo = SqliteUserRepository::new(pool);

        let profile = repo.find_astrologer(&astrologer.id).await.unwrap().unwrap();
        assert_eq!(profile.chat_rate, Decimal::new(1000, 2));
        assert_eq!(profile.chat_rate.to_string(), "10.00");
        assert_eq!(profile.call_rate, Decimal::new(2000, 2));
        assert!(profile.is_online);

        assert!(repo.find_astrologer(&customer.id).await.unwrap().is_none());
        assert!(repo.find_astrologer(&UserId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_online_toggles_availability() {
        let pool = test_pool().await;
        let (customer, astrologer) = seed_pair(&pool).await;
        let repo = SqliteUserRepository::new(pool);

        assert!(repo.set_online(&astrologer.id, false).await.unwrap());
        let profile = repo.find_astrologer(&astrologer.id).await.unwrap().unwrap();
        assert!(!profile.is_online);

        assert!(!repo.set_online(&customer.id, true).await.unwrap());
    }
}
