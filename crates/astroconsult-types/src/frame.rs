//! WebSocket frame vocabulary for consultation chat rooms.
//!
//! Every frame is a single JSON object tagged by `type`:
//!
//! | Direction | type | Payload |
//! |---|---|---|
//! | S→C | `connection_established` | `{message}` |
//! | C→S | `chat_message` | `{message: <text>}` |
//! | S→C | `chat_message` | `{message: {id, message, sender, created_at, is_from_customer}}` |
//! | C→S | `typing` | `{is_typing}` |
//! | S→C | `typing_indicator` | `{is_typing}` |
//! | S→C | `error` | `{message}` |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::chat::ChatMessage;
use crate::user::{User, UserId};

/// Frame sent by a client over the chat socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// A chat line. Blank text is discarded by the gateway.
    ChatMessage {
        #[serde(default)]
        message: String,
    },
    /// Typing started or stopped.
    Typing {
        #[serde(default)]
        is_typing: bool,
    },
}

/// Why an inbound text frame could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid message format")]
    InvalidFormat,

    #[error("Unknown message type: '{0}'")]
    UnknownType(String),
}

impl ClientFrame {
    /// Decode one inbound text frame.
    ///
    /// Distinguishes unparseable payloads from well-formed frames of an
    /// unsupported `type`, so the client gets a precise error back.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|_| FrameError::InvalidFormat)?;

        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(FrameError::InvalidFormat)?;

        match kind {
            "chat_message" | "typing" => {
                serde_json::from_value(value).map_err(|_| FrameError::InvalidFormat)
            }
            other => Err(FrameError::UnknownType(other.to_string())),
        }
    }
}

/// The sender block embedded in a broadcast chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderSummary {
    pub id: UserId,
    pub phone_number: String,
    pub first_name: String,
}

impl From<&User> for SenderSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            phone_number: user.phone_number.clone(),
            first_name: user.first_name.clone(),
        }
    }
}

/// Canonical server echo of a persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    pub id: Uuid,
    pub message: String,
    pub sender: SenderSummary,
    pub created_at: DateTime<Utc>,
    pub is_from_customer: bool,
}

/// Frame sent by the server to a room member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    ConnectionEstablished { message: String },
    ChatMessage { message: ChatMessagePayload },
    TypingIndicator { is_typing: bool },
    Error { message: String },
}

impl ServerFrame {
    /// Greeting sent once a connection is authorized.
    pub fn connection_established() -> Self {
        ServerFrame::ConnectionEstablished {
            message: "Connected to chat".to_string(),
        }
    }

    /// Broadcast frame for a persisted message.
    pub fn chat_message(message: &ChatMessage, sender: &User, is_from_customer: bool) -> Self {
        ServerFrame::ChatMessage {
            message: ChatMessagePayload {
                id: message.id,
                message: message.message.clone(),
                sender: SenderSummary::from(sender),
                created_at: message.created_at,
                is_from_customer,
            },
        }
    }

    pub fn typing_indicator(is_typing: bool) -> Self {
        ServerFrame::TypingIndicator { is_typing }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }
}
