//! Room broadcast fabric.
//!
//! One room per consultation, holding the connections currently attached to
//! its chat. Each member owns a bounded `mpsc` outbox; delivery uses
//! `try_send` so a slow or vanished member never blocks the sender or the
//! rest of the room.

use std::collections::HashMap;
use std::fmt;

use astroconsult_types::consultation::ConsultationId;
use astroconsult_types::frame::ServerFrame;
use astroconsult_types::user::UserId;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifies one socket. A user with two open tabs holds two connection ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-member delivery failure. Never propagated beyond the broadcast call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbox full for connection {0}")]
    QueueFull(ConnectionId),

    #[error("outbox closed for connection {0}")]
    Closed(ConnectionId),
}

/// A registered connection and the sending half of its outbox.
#[derive(Debug, Clone)]
pub struct RoomMember {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    outbox: mpsc::Sender<ServerFrame>,
}

impl RoomMember {
    pub fn new(connection_id: ConnectionId, user_id: UserId, outbox: mpsc::Sender<ServerFrame>) -> Self {
        Self {
            connection_id,
            user_id,
            outbox,
        }
    }

    /// Queue a frame for this member without waiting.
    pub fn deliver(&self, frame: ServerFrame) -> Result<(), DeliveryError> {
        self.outbox.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull(self.connection_id),
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed(self.connection_id),
        })
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Consultation-scoped rooms keyed by consultation id.
///
/// Backed by a sharded `DashMap`: operations on one room serialize on that
/// room's shard, unrelated rooms do not contend.
#[derive(Debug, Default)]
pub struct RoomFabric {
    rooms: DashMap<ConsultationId, HashMap<ConnectionId, RoomMember>>,
}

impl RoomFabric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `member` in the room. Re-adding the same connection id is a no-op.
    pub fn add_member(&self, consultation_id: ConsultationId, member: RoomMember) {
        let connection_id = member.connection_id;
        let mut room = self.rooms.entry(consultation_id).or_default();
        room.entry(connection_id).or_insert(member);
        debug!(
            consultation_id = %consultation_id,
            connection_id = %connection_id,
            members = room.len(),
            "joined room"
        );
    }

    /// Unregister a connection. Absent members are ignored; an emptied room
    /// is dropped.
    pub fn remove_member(&self, consultation_id: &ConsultationId, connection_id: &ConnectionId) {
        let removed = match self.rooms.get_mut(consultation_id) {
            Some(mut room) => room.remove(connection_id).is_some(),
            None => return,
        };
        self.rooms.remove_if(consultation_id, |_, room| room.is_empty());

        if removed {
            debug!(
                consultation_id = %consultation_id,
                connection_id = %connection_id,
                "left room"
            );
        }
    }

    /// Deliver `frame` to every member of the room except `excluding`.
    ///
    /// Full or closed outboxes drop the frame for that member only.
    pub fn broadcast(
        &self,
        consultation_id: &ConsultationId,
        frame: &ServerFrame,
        excluding: &[ConnectionId],
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let Some(room) = self.rooms.get(consultation_id) else {
            return report;
        };

        for member in room.values() {
            if excluding.contains(&member.connection_id) {
                continue;
            }
            match member.deliver(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        consultation_id = %consultation_id,
                        connection_id = %member.connection_id,
                        user_id = %member.user_id,
                        error = %e,
                        "dropped room frame"
                    );
                    report.dropped += 1;
                }
            }
        }
        report
    }

    /// Number of members in a room; zero for unknown rooms.
    pub fn member_count(&self, consultation_id: &ConsultationId) -> usize {
        self.rooms.get(consultation_id).map(|r| r.len()).unwrap_or(0)
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
