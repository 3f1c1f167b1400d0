//! HTTP/REST API and chat WebSocket layer.
//!
//! Axum-based REST API at `/api/v1/` with bearer-token authentication,
//! envelope response format, and CORS support. Chat rooms are served at
//! `/ws/chat/{consultation_id}`.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
