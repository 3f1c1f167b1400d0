//! Consultation repository trait definition.

use astroconsult_types::consultation::{Consultation, ConsultationId, ConsultationStatus};
use astroconsult_types::error::RepositoryError;
use astroconsult_types::user::UserId;

/// Repository trait for consultation persistence.
///
/// Implementations live in astroconsult-infra (e.g., `SqliteConsultationRepository`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ConsultationRepository: Send + Sync {
    /// Insert a new consultation and return it as stored.
    ///
    /// `free_minutes_used` is decided atomically with the insert: the stored
    /// row gets `first_consultation_free_minutes` when the customer has no
    /// earlier consultation, otherwise zero. The incoming value is ignored.
    fn create(
        &self,
        consultation: &Consultation,
        first_consultation_free_minutes: u32,
    ) -> impl std::future::Future<Output = Result<Consultation, RepositoryError>> + Send;

    /// Get a consultation by its unique ID.
    fn get(
        &self,
        id: &ConsultationId,
    ) -> impl std::future::Future<Output = Result<Option<Consultation>, RepositoryError>> + Send;

    /// List consultations where the user is customer or astrologer, newest first.
    fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Consultation>, RepositoryError>> + Send;

    /// Persist `updated` only if the stored status still equals `expected`.
    ///
    /// Returns `false` when another writer changed the status first. This is
    /// the single serialization point for lifecycle transitions.
    fn compare_and_set(
        &self,
        updated: &Consultation,
        expected: ConsultationStatus,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
