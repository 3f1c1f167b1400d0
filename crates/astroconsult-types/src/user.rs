//! Marketplace users and the astrologer read model.
//!
//! Users are created by the phone/OTP identity flow, which lives outside this
//! service. Consultations only need a stable id, a role, and the two display
//! fields echoed in chat frames (`phone_number`, `first_name`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::consultation::ConsultationType;

/// Unique identifier for a user, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new UserId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a UserId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Marketplace role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Astrologer,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Customer => write!(f, "customer"),
            UserRole::Astrologer => write!(f, "astrologer"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "customer" => Ok(UserRole::Customer),
            "astrologer" => Ok(UserRole::Astrologer),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("invalid user role: '{other}'")),
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Customer
    }
}

/// An authenticated marketplace user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Normalized phone number (digits only, country code included).
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// "First Last", trimmed. Empty when neither name is set.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Astrologer pricing and availability, as read from the profile service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstrologerProfile {
    pub user_id: UserId,
    pub display_name: String,
    /// Per-minute rate for chat consultations.
    pub chat_rate: Decimal,
    /// Per-minute rate for call consultations.
    pub call_rate: Decimal,
    pub is_online: bool,
    pub is_busy: bool,
}

impl AstrologerProfile {
    /// Default chat rate for newly onboarded astrologers.
    pub const DEFAULT_CHAT_RATE: Decimal = Decimal::from_parts(1000, 0, 0, false, 2);
    /// Default call rate for newly onboarded astrologers.
    pub const DEFAULT_CALL_RATE: Decimal = Decimal::from_parts(2000, 0, 0, false, 2);

    /// The current per-minute rate for the given consultation type.
    pub fn rate_for(&self, consultation_type: ConsultationType) -> Decimal {
        match consultation_type {
            ConsultationType::Chat => self.chat_rate,
            ConsultationType::Call => self.call_rate,
        }
    }

    /// Whether the astrologer accepts new consultations right now.
    ///
    /// Only the online flag gates new consultations; `is_busy` is a display hint.
    pub fn is_available(&self) -> bool {
        self.is_online
    }
}

/// Normalize a phone number to digits only, prefixing the default country
/// code (`91`) to bare 10-digit numbers.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("91{digits}")
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> AstrologerProfile {
        AstrologerProfile {
            user_id: UserId::new(),
            display_name: "Pandit Rao".to_string(),
            chat_rate: AstrologerProfile::DEFAULT_CHAT_RATE,
            call_rate: AstrologerProfile::DEFAULT_CALL_RATE,
            is_online: true,
            is_busy: false,
        }
    }

    #[test]
    fn test_user_role_roundtrip() {
        for role in [UserRole::Customer, UserRole::Astrologer, UserRole::Admin] {
            let parsed: UserRole = role.to_string().parse().unwrap();
            assert_eq!(role, parsed);
        }
        assert!("guru".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_rate_for_type() {
        let p = profile();
        assert_eq!(p.rate_for(ConsultationType::Chat), Decimal::new(10, 0));
        assert_eq!(p.rate_for(ConsultationType::Call), Decimal::new(20, 0));
    }

    #[test]
    fn test_default_rates_keep_two_decimal_places() {
        assert_eq!(AstrologerProfile::DEFAULT_CHAT_RATE.to_string(), "10.00");
        assert_eq!(AstrologerProfile::DEFAULT_CALL_RATE.to_string(), "20.00");
    }

    #[test]
    fn test_busy_astrologer_is_still_available() {
        let p = AstrologerProfile {
            is_busy: true,
            ..profile()
        };
        assert!(p.is_available());

        let offline = AstrologerProfile {
            is_online: false,
            ..profile()
        };
        assert!(!offline.is_available());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("98765 43210"), "919876543210");
        assert_eq!(normalize_phone("+91-98765-43210"), "919876543210");
        assert_eq!(normalize_phone("14155550100"), "14155550100");
    }

    #[test]
    fn test_user_id_serializes_as_plain_uuid() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
    }

    #[test]
    fn test_full_name() {
        let user = User {
            id: UserId::new(),
            phone_number: "919876543210".to_string(),
            first_name: "Asha".to_string(),
            last_name: String::new(),
            role: UserRole::Customer,
            created_at: Utc::now(),
        };
        assert_eq!(user.full_name(), "Asha");
    }
}
