//! Chat message repository trait definition.

use astroconsult_types::chat::ChatMessage;
use astroconsult_types::consultation::ConsultationId;
use astroconsult_types::error::RepositoryError;

/// Append-only storage for chat messages.
///
/// Messages are immutable once appended: no update or delete exists.
pub trait MessageRepository: Send + Sync {
    /// Append a message.
    ///
    /// Returns `RepositoryError::NotFound` if the consultation does not exist
    /// at insert time.
    fn append(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All messages of a consultation, ordered by `created_at` ASC then `id` ASC.
    fn list(
        &self,
        consultation_id: &ConsultationId,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;
}
