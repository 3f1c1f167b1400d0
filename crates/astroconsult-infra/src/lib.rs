//! Infrastructure layer for the live consultation service.
//!
//! Contains implementations of the ports defined in `astroconsult-core`:
//! SQLite storage for consultations, chat messages, users and astrologer
//! profiles, hashed bearer tokens, plus the `config.toml` loader.

pub mod config;
pub mod sqlite;
