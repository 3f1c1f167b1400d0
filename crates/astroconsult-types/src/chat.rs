//! Chat message type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consultation::ConsultationId;
use crate::user::UserId;

/// A single message within a consultation's chat.
///
/// Append-only: once persisted a message is never edited or deleted.
/// Messages are ordered by `created_at` within a consultation, ties broken
/// by the time-sortable `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub consultation_id: ConsultationId,
    pub sender_id: UserId,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a new unread message stamped with a server-assigned id and time.
    pub fn new(consultation_id: ConsultationId, sender_id: UserId, message: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            consultation_id,
            sender_id,
            message,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_is_unread() {
        let msg = ChatMessage::new(ConsultationId::new(), UserId::new(), "Namaste".to_string());
        assert!(!msg.is_read);
        assert_eq!(msg.message, "Namaste");
    }

    #[test]
    fn test_ids_sort_by_creation() {
        let consultation_id = ConsultationId::new();
        let sender = UserId::new();
        let first = ChatMessage::new(consultation_id, sender, "a".to_string());
        let second = ChatMessage::new(consultation_id, sender, "b".to_string());
        assert!(first.id < second.id);
        assert!(first.created_at <= second.created_at);
    }
}
