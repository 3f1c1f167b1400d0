//! Astrologer directory port (read-only view of astrologer profiles).

use astroconsult_types::error::RepositoryError;
use astroconsult_types::user::{AstrologerProfile, UserId};

/// Lookup of astrologer pricing and availability.
///
/// Profile CRUD and ratings are owned by another service; consultations only
/// read the current rate and online flag at creation time.
pub trait AstrologerDirectory: Send + Sync {
    /// The astrologer profile for `user_id`, or `None` when the user does not
    /// exist, is not an astrologer, or has no profile.
    fn find_astrologer(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Option<AstrologerProfile>, RepositoryError>> + Send;
}
