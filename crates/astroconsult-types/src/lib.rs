//! Shared domain types for the live consultation service.
//!
//! This crate contains the core domain types used across the workspace:
//! Consultation, ChatMessage, User, AstrologerProfile, the WebSocket frame
//! vocabulary, configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, rust_decimal, thiserror.

pub mod chat;
pub mod config;
pub mod consultation;
pub mod error;
pub mod frame;
pub mod user;
