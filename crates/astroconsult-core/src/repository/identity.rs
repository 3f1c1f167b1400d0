//! Identity provider port.

use astroconsult_types::error::RepositoryError;
use astroconsult_types::user::User;

/// Resolves a bearer token issued by the phone/OTP login flow to a user.
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` for unknown or revoked tokens.
    fn resolve_token(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;
}
