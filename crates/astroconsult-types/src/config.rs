//! Server configuration types.
//!
//! `ServerConfig` represents the `config.toml` in the data directory. Every
//! field has a default, so an empty or missing file yields a working server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the consultation server.
///
/// Loaded from `~/.astroconsult/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Promotional minutes granted on a customer's first-ever consultation.
    #[serde(default = "default_first_consultation_free_minutes")]
    pub first_consultation_free_minutes: u32,

    /// Start chat consultations immediately after creation.
    #[serde(default = "default_auto_start_chat")]
    pub auto_start_chat: bool,

    /// Outbound frame queue depth per room member. A full queue drops frames
    /// for that member only.
    #[serde(default = "default_member_queue_capacity")]
    pub member_queue_capacity: usize,

    /// Upper bound on a single message persist/list call.
    #[serde(default = "default_persist_timeout_ms")]
    pub persist_timeout_ms: u64,

    /// Upper bound on waiting for a pooled database connection.
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
}

fn default_first_consultation_free_minutes() -> u32 {
    5
}

fn default_auto_start_chat() -> bool {
    true
}

fn default_member_queue_capacity() -> usize {
    64
}

fn default_persist_timeout_ms() -> u64 {
    5_000
}

fn default_db_acquire_timeout_ms() -> u64 {
    5_000
}

impl ServerConfig {
    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    pub fn db_acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.db_acquire_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            first_consultation_free_minutes: default_first_consultation_free_minutes(),
            auto_start_chat: default_auto_start_chat(),
            member_queue_capacity: default_member_queue_capacity(),
            persist_timeout_ms: default_persist_timeout_ms(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
        }
    }
}
