//! Append-only message store with bounded storage calls.

use std::future::Future;
use std::time::Duration;

use astroconsult_types::chat::ChatMessage;
use astroconsult_types::consultation::ConsultationId;
use astroconsult_types::error::{ChatError, RepositoryError};
use astroconsult_types::user::UserId;
use tracing::{debug, warn};

use crate::repository::message::MessageRepository;

/// Durably appends and replays chat messages per consultation.
///
/// Generic over `MessageRepository` to maintain clean architecture
/// (astroconsult-core never depends on astroconsult-infra).
pub struct MessageStore<M: MessageRepository> {
    repo: M,
    timeout: Duration,
}

impl<M: MessageRepository> MessageStore<M> {
    /// Create a store whose storage calls fail with `ChatError::Timeout`
    /// after `timeout`.
    pub fn new(repo: M, timeout: Duration) -> Self {
        Self { repo, timeout }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &M {
        &self.repo
    }

    /// Persist a new message with a server-assigned id and timestamp.
    ///
    /// Fails with `ChatError::ConsultationNotFound` if the consultation no
    /// longer exists.
    pub async fn persist(
        &self,
        consultation_id: &ConsultationId,
        sender_id: &UserId,
        text: String,
    ) -> Result<ChatMessage, ChatError> {
        let message = ChatMessage::new(*consultation_id, *sender_id, text);
        self.bounded(self.repo.append(&message)).await?;
        debug!(
            consultation_id = %consultation_id,
            message_id = %message.id,
            "chat message persisted"
        );
        Ok(message)
    }

    /// Messages of a consultation in ascending `created_at` order.
    ///
    /// Used for history replay and late-joiner catch-up.
    pub async fn list(&self, consultation_id: &ConsultationId) -> Result<Vec<ChatMessage>, ChatError> {
        self.bounded(self.repo.list(consultation_id)).await
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, ChatError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(ChatError::from),
            Err(_) => {
                warn!(timeout = ?self.timeout, "message store call timed out");
                Err(ChatError::Timeout(self.timeout))
            }
        }
    }
}
