//! Chat gateway: admits sockets into consultation rooms.
//!
//! `ChatGateway::connect` is the `connecting` step. A caller that is not
//! authenticated or not one of the two participants never gets a
//! `ChatConnection`, so it never joins a room and is sent no frames.

pub mod connection;

use std::sync::Arc;

use astroconsult_types::consultation::ConsultationId;
use astroconsult_types::error::ConsultationError;
use astroconsult_types::frame::ServerFrame;
use astroconsult_types::user::User;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub use connection::{ChatConnection, ConnectionState, PERSIST_FAILED};

use crate::chat::MessageStore;
use crate::consultation::SessionRegistry;
use crate::repository::consultation::ConsultationRepository;
use crate::repository::directory::AstrologerDirectory;
use crate::repository::message::MessageRepository;
use crate::room::{ConnectionId, RoomFabric, RoomMember};

/// Why a socket was not admitted.
#[derive(Debug, Error)]
pub enum ConnectRejected {
    #[error("authentication required")]
    Unauthenticated,

    /// The consultation does not exist or the caller is not a participant.
    #[error("not a participant of this consultation")]
    NotParticipant,

    #[error("consultation lookup failed: {0}")]
    Unavailable(#[from] ConsultationError),
}

/// Admits authenticated participants into consultation rooms.
pub struct ChatGateway<C, D, M>
where
    C: ConsultationRepository,
    D: AstrologerDirectory,
    M: MessageRepository,
{
    registry: Arc<SessionRegistry<C, D, M>>,
    messages: Arc<MessageStore<M>>,
    fabric: Arc<RoomFabric>,
    queue_capacity: usize,
}

impl<C, D, M> ChatGateway<C, D, M>
where
    C: ConsultationRepository,
    D: AstrologerDirectory,
    M: MessageRepository,
{
    /// - `queue_capacity`: outbound frame buffer per connection
    pub fn new(
        registry: Arc<SessionRegistry<C, D, M>>,
        messages: Arc<MessageStore<M>>,
        fabric: Arc<RoomFabric>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            registry,
            messages,
            fabric,
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn fabric(&self) -> &Arc<RoomFabric> {
        &self.fabric
    }

    /// Authorize `identity` for the consultation's room.
    ///
    /// On success the connection is registered with the room and
    /// `connection_established` is already queued on the returned receiver,
    /// which the socket task drains into the transport.
    pub async fn connect(
        &self,
        identity: Option<User>,
        consultation_id: ConsultationId,
    ) -> Result<(ChatConnection<M>, mpsc::Receiver<ServerFrame>), ConnectRejected> {
        let Some(user) = identity else {
            warn!(consultation_id = %consultation_id, "chat connection rejected: unauthenticated");
            return Err(ConnectRejected::Unauthenticated);
        };

        let Some(consultation) = self
            .registry
            .participant_consultation(&user, &consultation_id)
            .await?
        else {
            warn!(
                consultation_id = %consultation_id,
                user_id = %user.id,
                "chat connection rejected: not a participant"
            );
            return Err(ConnectRejected::NotParticipant);
        };

        let (outbox, inbox) = mpsc::channel(self.queue_capacity);
        let connection_id = ConnectionId::new();
        self.fabric.add_member(
            consultation_id,
            RoomMember::new(connection_id, user.id, outbox.clone()),
        );

        let connection = ChatConnection {
            connection_id,
            consultation_id,
            customer_id: consultation.customer_id,
            user,
            messages: Arc::clone(&self.messages),
            fabric: Arc::clone(&self.fabric),
            outbox,
            state: ConnectionState::Authorized,
        };
        // Fresh channel with capacity >= 1, so the greeting always fits.
        let _ = connection.outbox.try_send(ServerFrame::connection_established());

        info!(
            consultation_id = %consultation_id,
            connection_id = %connection_id,
            user_id = %connection.user.id,
            "chat connection authorized"
        );
        Ok((connection, inbox))
    }
}

impl<C, D, M> Clone for ChatGateway<C, D, M>
where
    C: ConsultationRepository,
    D: AstrologerDirectory,
    M: MessageRepository,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            messages: Arc::clone(&self.messages),
            fabric: Arc::clone(&self.fabric),
            queue_capacity: self.queue_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use astroconsult_types::consultation::{Consultation, ConsultationType};
    use astroconsult_types::frame::ChatMessagePayload;
    use astroconsult_types::user::UserRole;
    use rust_decimal::Decimal;

    use super::*;
    use crate::testing::{
        InMemoryConsultations, InMemoryMessages, SlowMessages, StaticDirectory, profile, user,
    };

    type Gateway = ChatGateway<InMemoryConsultations, StaticDirectory, InMemoryMessages>;

    struct Fixture {
        gateway: Gateway,
        messages: InMemoryMessages,
        consultation: Consultation,
        customer: User,
        astrologer: User,
    }

    async fn fixture() -> Fixture {
        let customer = user(UserRole::Customer, "Asha");
        let astrologer = user(UserRole::Astrologer, "Vikram");
        let messages = InMemoryMessages::default();
        let store = Arc::new(MessageStore::new(messages.clone(), Duration::from_secs(1)));
        let registry = Arc::new(SessionRegistry::new(
            InMemoryConsultations::default(),
            StaticDirectory::with(profile(astrologer.id, Decimal::new(1000, 2), true)),
            Arc::clone(&store),
            5,
        ));
        let consultation = registry
            .create(&customer, &astrologer.id, ConsultationType::Chat)
            .await
            .unwrap();
        messages.allow(consultation.id);

        let gateway = ChatGateway::new(registry, store, Arc::new(RoomFabric::new()), 16);
        Fixture {
            gateway,
            messages,
            consultation,
            customer,
            astrologer,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<ServerFrame>) -> Vec<ServerFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn chat_payload(frame: &ServerFrame) -> &ChatMessagePayload {
        match frame {
            ServerFrame::ChatMessage { message } => message,
            other => panic!("expected chat_message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_participant_receives_greeting_and_joins_room() {
        let f = fixture().await;
        let (conn, mut rx) = f
            .gateway
            .connect(Some(f.customer.clone()), f.consultation.id)
            .await
            .unwrap();

        assert_eq!(conn.state(), ConnectionState::Authorized);
        assert_eq!(drain(&mut rx), vec![ServerFrame::connection_established()]);
        assert_eq!(f.gateway.fabric().member_count(&f.consultation.id), 1);
    }

    #[tokio::test]
    async fn test_non_participant_and_anonymous_are_rejected_without_frames() {
        let f = fixture().await;
        let stranger = user(UserRole::Customer, "Stranger");

        assert!(matches!(
            f.gateway.connect(Some(stranger), f.consultation.id).await,
            Err(ConnectRejected::NotParticipant)
        ));
        assert!(matches!(
            f.gateway.connect(None, f.consultation.id).await,
            Err(ConnectRejected::Unauthenticated)
        ));
        assert!(matches!(
            f.gateway
                .connect(Some(f.customer.clone()), ConsultationId::new())
                .await,
            Err(ConnectRejected::NotParticipant)
        ));
        assert_eq!(f.gateway.fabric().room_count(), 0);
    }

    #[tokio::test]
    async fn test_chat_message_is_persisted_and_echoed_to_everyone() {
        let f = fixture().await;
        let (mut customer, mut rx_c) = f
            .gateway
            .connect(Some(f.customer.clone()), f.consultation.id)
            .await
            .unwrap();
        let (_astrologer, mut rx_a) = f
            .gateway
            .connect(Some(f.astrologer.clone()), f.consultation.id)
            .await
            .unwrap();
        drain(&mut rx_c);
        drain(&mut rx_a);

        customer
            .handle_text(r#"{"type":"chat_message","message":"  What does Saturn say?  "}"#)
            .await;

        let to_customer = drain(&mut rx_c);
        let to_astrologer = drain(&mut rx_a);
        assert_eq!(to_customer.len(), 1);
        assert_eq!(to_customer, to_astrologer);

        let payload = chat_payload(&to_customer[0]);
        assert_eq!(payload.message, "What does Saturn say?");
        assert_eq!(payload.sender.id, f.customer.id);
        assert_eq!(payload.sender.first_name, "Asha");
        assert!(payload.is_from_customer);
        assert_eq!(f.messages.count(), 1);
    }

    #[tokio::test]
    async fn test_astrologer_messages_are_not_from_customer() {
        let f = fixture().await;
        let (mut astrologer, mut rx) = f
            .gateway
            .connect(Some(f.astrologer.clone()), f.consultation.id)
            .await
            .unwrap();
        drain(&mut rx);

        astrologer
            .handle_text(r#"{"type":"chat_message","message":"Namaste"}"#)
            .await;
        assert!(!chat_payload(&drain(&mut rx)[0]).is_from_customer);
    }

    #[tokio::test]
    async fn test_blank_messages_are_discarded() {
        let f = fixture().await;
        let (mut conn, mut rx) = f
            .gateway
            .connect(Some(f.customer.clone()), f.consultation.id)
            .await
            .unwrap();
        drain(&mut rx);

        conn.handle_text(r#"{"type":"chat_message","message":"   "}"#).await;
        conn.handle_text(r#"{"type":"chat_message"}"#).await;

        assert!(drain(&mut rx).is_empty());
        assert_eq!(f.messages.count(), 0);
    }

    #[tokio::test]
    async fn test_typing_skips_only_the_originating_connection() {
        let f = fixture().await;
        let (mut tab1, mut rx1) = f
            .gateway
            .connect(Some(f.customer.clone()), f.consultation.id)
            .await
            .unwrap();
        let (_tab2, mut rx2) = f
            .gateway
            .connect(Some(f.customer.clone()), f.consultation.id)
            .await
            .unwrap();
        let (_astro, mut rx3) = f
            .gateway
            .connect(Some(f.astrologer.clone()), f.consultation.id)
            .await
            .unwrap();
        drain(&mut rx1);
        drain(&mut rx2);
        drain(&mut rx3);

        tab1.handle_text(r#"{"type":"typing","is_typing":true}"#).await;

        assert!(drain(&mut rx1).is_empty());
        assert_eq!(drain(&mut rx2), vec![ServerFrame::typing_indicator(true)]);
        assert_eq!(drain(&mut rx3), vec![ServerFrame::typing_indicator(true)]);
    }

    #[tokio::test]
    async fn test_bad_frames_get_an_error_and_keep_the_connection() {
        let f = fixture().await;
        let (mut conn, mut rx) = f
            .gateway
            .connect(Some(f.customer.clone()), f.consultation.id)
            .await
            .unwrap();
        drain(&mut rx);

        conn.handle_text("not json").await;
        conn.handle_text(r#"{"type":"video_call"}"#).await;

        assert_eq!(
            drain(&mut rx),
            vec![
                ServerFrame::error("Invalid message format"),
                ServerFrame::error("Unknown message type: 'video_call'"),
            ]
        );
        assert_eq!(conn.state(), ConnectionState::Authorized);
    }

    #[tokio::test]
    async fn test_persist_failure_reports_to_sender_only() {
        let customer = user(UserRole::Customer, "Asha");
        let astrologer = user(UserRole::Astrologer, "Vikram");
        let store = Arc::new(MessageStore::new(
            SlowMessages(Duration::from_secs(5)),
            Duration::from_millis(20),
        ));
        let consultations = InMemoryConsultations::default();
        let consultation = Consultation::new_pending(
            customer.id,
            astrologer.id,
            ConsultationType::Chat,
            Decimal::new(1000, 2),
            chrono::Utc::now(),
        );
        consultations.insert_raw(consultation.clone());
        let registry = Arc::new(SessionRegistry::new(
            consultations,
            StaticDirectory::default(),
            Arc::clone(&store),
            5,
        ));
        let gateway = ChatGateway::new(registry, store, Arc::new(RoomFabric::new()), 16);

        let (mut conn, mut rx) = gateway
            .connect(Some(customer), consultation.id)
            .await
            .unwrap();
        let (_other, mut rx_other) = gateway
            .connect(Some(astrologer), consultation.id)
            .await
            .unwrap();
        drain(&mut rx);
        drain(&mut rx_other);

        conn.handle_text(r#"{"type":"chat_message","message":"hello"}"#).await;

        assert_eq!(drain(&mut rx), vec![ServerFrame::error(PERSIST_FAILED)]);
        assert!(drain(&mut rx_other).is_empty());
    }

    #[tokio::test]
    async fn test_dropping_the_connection_leaves_the_room() {
        let f = fixture().await;
        let (conn, _rx) = f
            .gateway
            .connect(Some(f.customer.clone()), f.consultation.id)
            .await
            .unwrap();
        let (mut other, _rx_other) = f
            .gateway
            .connect(Some(f.astrologer.clone()), f.consultation.id)
            .await
            .unwrap();
        assert_eq!(f.gateway.fabric().member_count(&f.consultation.id), 2);

        drop(conn);
        assert_eq!(f.gateway.fabric().member_count(&f.consultation.id), 1);

        other.close();
        other.close();
        assert_eq!(other.state(), ConnectionState::Closed);
        assert_eq!(f.gateway.fabric().room_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_does_not_touch_consultation_state() {
        let f = fixture().await;
        let (conn, _rx) = f
            .gateway
            .connect(Some(f.customer.clone()), f.consultation.id)
            .await
            .unwrap();
        drop(conn);

        let after = f
            .gateway
            .registry
            .get(&f.customer, &f.consultation.id)
            .await
            .unwrap();
        assert_eq!(after.status, f.consultation.status);
    }
}
