//! HTTP request handlers for the REST API and chat sockets.

pub mod consultation;
pub mod ws;
