//! One authorized chat socket bound to a consultation room.

use std::sync::Arc;

use astroconsult_types::consultation::ConsultationId;
use astroconsult_types::frame::{ClientFrame, ServerFrame};
use astroconsult_types::user::{User, UserId};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::chat::MessageStore;
use crate::repository::message::MessageRepository;
use crate::room::{ConnectionId, RoomFabric};

/// Lifecycle of an admitted chat connection: `Authorized -> Closed`.
///
/// The connecting step is `ChatGateway::connect` itself; a socket it rejects
/// never gets a `ChatConnection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Authorized,
    Closed,
}

/// Error text sent to the sender when a chat line could not be persisted.
pub const PERSIST_FAILED: &str = "Failed to save message";

/// An authorized member of a consultation room.
///
/// Dropping the connection unregisters it from the room, so every exit path
/// of the socket task (close frame, transport error, cancellation) cleans up.
pub struct ChatConnection<M: MessageRepository> {
    pub(crate) connection_id: ConnectionId,
    pub(crate) consultation_id: ConsultationId,
    pub(crate) customer_id: UserId,
    pub(crate) user: User,
    pub(crate) messages: Arc<MessageStore<M>>,
    pub(crate) fabric: Arc<RoomFabric>,
    pub(crate) outbox: mpsc::Sender<ServerFrame>,
    pub(crate) state: ConnectionState,
}

impl<M: MessageRepository> ChatConnection<M> {
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn consultation_id(&self) -> ConsultationId {
        self.consultation_id
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Handle one inbound text frame.
    ///
    /// Malformed or unknown frames get an `error` frame back on this
    /// connection only; the connection stays open.
    pub async fn handle_text(&mut self, text: &str) {
        if self.state != ConnectionState::Authorized {
            return;
        }

        match ClientFrame::parse(text) {
            Ok(ClientFrame::ChatMessage { message }) => self.handle_chat(message).await,
            Ok(ClientFrame::Typing { is_typing }) => {
                self.fabric.broadcast(
                    &self.consultation_id,
                    &ServerFrame::typing_indicator(is_typing),
                    &[self.connection_id],
                );
            }
            Err(e) => {
                debug!(connection_id = %self.connection_id, error = %e, "rejected client frame");
                self.reply(ServerFrame::error(e.to_string()));
            }
        }
    }

    async fn handle_chat(&self, text: String) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        match self
            .messages
            .persist(&self.consultation_id, &self.user.id, text.to_string())
            .await
        {
            Ok(message) => {
                let is_from_customer = self.user.id == self.customer_id;
                let frame = ServerFrame::chat_message(&message, &self.user, is_from_customer);
                let report = self.fabric.broadcast(&self.consultation_id, &frame, &[]);
                debug!(
                    consultation_id = %self.consultation_id,
                    message_id = %message.id,
                    delivered = report.delivered,
                    dropped = report.dropped,
                    "chat message broadcast"
                );
            }
            Err(e) => {
                warn!(
                    consultation_id = %self.consultation_id,
                    user_id = %self.user.id,
                    error = %e,
                    "failed to persist chat message"
                );
                self.reply(ServerFrame::error(PERSIST_FAILED));
            }
        }
    }

    /// Queue a frame for this connection only.
    fn reply(&self, frame: ServerFrame) {
        if self.outbox.try_send(frame).is_err() {
            debug!(connection_id = %self.connection_id, "reply dropped, outbox unavailable");
        }
    }

    /// Leave the room. Idempotent.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Authorized {
            self.fabric
                .remove_member(&self.consultation_id, &self.connection_id);
            debug!(
                consultation_id = %self.consultation_id,
                connection_id = %self.connection_id,
                user_id = %self.user.id,
                "chat connection closed"
            );
        }
        self.state = ConnectionState::Closed;
    }
}

impl<M: MessageRepository> Drop for ChatConnection<M> {
    fn drop(&mut self) {
        self.close();
    }
}
