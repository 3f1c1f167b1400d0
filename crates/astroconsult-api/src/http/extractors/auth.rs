//! Bearer token authentication extractor.
//!
//! Tokens come from `Authorization: Bearer <token>` and are resolved through
//! the `IdentityProvider`, which compares SHA-256 digests against the
//! `access_tokens` table.

use astroconsult_core::repository::identity::IdentityProvider;
use astroconsult_types::user::User;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated caller. Extracting this validates the bearer token.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            AppError::Unauthorized(
                "Missing token. Provide it via 'Authorization: Bearer <token>' header.".to_string(),
            )
        })?;

        match state.identity.resolve_token(&token).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => Err(AppError::Unauthorized("Invalid token.".to_string())),
            Err(e) => Err(AppError::Internal(format!("Database error: {e}"))),
        }
    }
}

/// The token from an `Authorization: Bearer` header, if present and non-empty.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}
