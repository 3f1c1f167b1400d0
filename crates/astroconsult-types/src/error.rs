use std::time::Duration;

use thiserror::Error;

use crate::consultation::ConsultationStatus;

/// Errors related to consultation lifecycle and billing.
#[derive(Debug, Error)]
pub enum ConsultationError {
    /// Input rejected before any mutation.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Caller is not a participant of the consultation.
    #[error("not a participant of this consultation")]
    Forbidden,

    /// Operation attempted from the wrong prior status.
    #[error("consultation is {actual}, expected {expected}")]
    StateConflict {
        expected: ConsultationStatus,
        actual: ConsultationStatus,
    },

    #[error("consultation not found")]
    NotFound,

    /// A collaborator (e.g. the astrologer rate lookup) failed. Nothing was written.
    #[error("external dependency failed: {0}")]
    ExternalDependency(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl ConsultationError {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ConsultationError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Errors related to chat message persistence.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("consultation not found")]
    ConsultationNotFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("message store timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from repository operations (used by trait definitions in astroconsult-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for ConsultationError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ConsultationError::NotFound,
            other => ConsultationError::Storage(other.to_string()),
        }
    }
}

impl From<RepositoryError> for ChatError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ChatError::ConsultationNotFound,
            other => ChatError::Storage(other.to_string()),
        }
    }
}

impl From<ChatError> for ConsultationError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::ConsultationNotFound => ConsultationError::NotFound,
            ChatError::Storage(msg) => ConsultationError::Storage(msg),
            ChatError::Timeout(after) => ConsultationError::Timeout(after),
        }
    }
}
