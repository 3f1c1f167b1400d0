//! Consultation types: one billed session between a customer and an astrologer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::user::UserId;

/// Unique identifier for a consultation, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsultationId(pub Uuid);

impl ConsultationId {
    /// Create a new ConsultationId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a ConsultationId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ConsultationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConsultationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConsultationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Medium of a consultation. Determines which profile rate applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationType {
    Chat,
    Call,
}

impl fmt::Display for ConsultationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationType::Chat => write!(f, "chat"),
            ConsultationType::Call => write!(f, "call"),
        }
    }
}

impl FromStr for ConsultationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" => Ok(ConsultationType::Chat),
            "call" => Ok(ConsultationType::Call),
            other => Err(format!("invalid consultation type: '{other}'")),
        }
    }
}

impl Default for ConsultationType {
    fn default() -> Self {
        ConsultationType::Chat
    }
}

/// Lifecycle status of a consultation.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (status IN ('pending', 'active', 'completed', 'cancelled'))`
///
/// The only edges are `pending -> active -> completed` and
/// `pending -> cancelled`. Both `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConsultationStatus::Completed | ConsultationStatus::Cancelled)
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationStatus::Pending => write!(f, "pending"),
            ConsultationStatus::Active => write!(f, "active"),
            ConsultationStatus::Completed => write!(f, "completed"),
            ConsultationStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for ConsultationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ConsultationStatus::Pending),
            "active" => Ok(ConsultationStatus::Active),
            "completed" => Ok(ConsultationStatus::Completed),
            "cancelled" => Ok(ConsultationStatus::Cancelled),
            other => Err(format!("invalid consultation status: '{other}'")),
        }
    }
}

impl Default for ConsultationStatus {
    fn default() -> Self {
        ConsultationStatus::Pending
    }
}

/// One billed session between a customer and an astrologer.
///
/// `rate_per_minute` is copied from the astrologer's profile at creation and
/// never changes afterwards. `total_cost` stays `None` until the consultation
/// completes and is written exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: ConsultationId,
    pub customer_id: UserId,
    pub astrologer_id: UserId,
    pub consultation_type: ConsultationType,
    pub status: ConsultationStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Whole minutes between `started_at` and `ended_at` (set on completion).
    pub duration_minutes: u32,
    pub rate_per_minute: Decimal,
    pub total_cost: Option<Decimal>,
    /// Promotional minutes deducted before billing.
    pub free_minutes_used: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Consultation {
    /// Build a fresh `pending` consultation.
    ///
    /// `free_minutes_used` starts at zero; the repository decides the
    /// first-consultation allowance atomically with the insert.
    pub fn new_pending(
        customer_id: UserId,
        astrologer_id: UserId,
        consultation_type: ConsultationType,
        rate_per_minute: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConsultationId::new(),
            customer_id,
            astrologer_id,
            consultation_type,
            status: ConsultationStatus::Pending,
            started_at: None,
            ended_at: None,
            duration_minutes: 0,
            rate_per_minute,
            total_cost: None,
            free_minutes_used: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user_id` is the customer or the astrologer of this consultation.
    pub fn is_participant(&self, user_id: &UserId) -> bool {
        self.customer_id == *user_id || self.astrologer_id == *user_id
    }

    pub fn is_active(&self) -> bool {
        self.status == ConsultationStatus::Active
    }
}
