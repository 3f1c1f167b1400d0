//! Bearer token storage.
//!
//! Tokens are shown once at issue time and stored only as SHA-256 digests in
//! the `access_tokens` table.

use astroconsult_core::repository::identity::IdentityProvider;
use astroconsult_types::error::RepositoryError;
use astroconsult_types::user::{User, UserId};
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};

use super::pool::DatabasePool;
use super::user::UserRow;
use super::{format_datetime, query_error};

/// Prefix that makes leaked tokens easy to recognize.
pub const TOKEN_PREFIX: &str = "acs_";

/// Compute SHA-256 hash of a token (lowercase hex).
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// 32 random bytes, hex encoded, behind `TOKEN_PREFIX`.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    format!(
        "{TOKEN_PREFIX}{}",
        bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
    )
}

/// SQLite-backed `IdentityProvider`.
#[derive(Clone)]
pub struct SqliteIdentityProvider {
    pool: DatabasePool,
}

impl SqliteIdentityProvider {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Issue a new token for `user_id`. Returns the plaintext, which is not
    /// recoverable afterwards.
    pub async fn issue_token(&self, user_id: &UserId) -> Result<String, RepositoryError> {
        let token = generate_token();
        sqlx::query(
            "INSERT INTO access_tokens (id, user_id, token_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::now_v7().to_string())
        .bind(user_id.to_string())
        .bind(hash_token(&token))
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        tracing::info!(user_id = %user_id, "access token issued");
        Ok(token)
    }
}

impl IdentityProvider for SqliteIdentityProvider {
    async fn resolve_token(&self, token: &str) -> Result<Option<User>, RepositoryError> {
        let token_hash = hash_token(token.trim());
        let row = sqlx::query(
            "SELECT u.* FROM access_tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.token_hash = ?",
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user = UserRow::from_row(&row).map_err(query_error)?.into_user()?;

        // Best effort, don't fail the request
        let _ = sqlx::query("UPDATE access_tokens SET last_used_at = ? WHERE token_hash = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(&token_hash)
            .execute(&self.pool.writer)
            .await;

        Ok(Some(user))
    }
}
