//! Chat message persistence for consultations.
//!
//! The `MessageStore` wraps a `MessageRepository` with server-side id and
//! timestamp assignment and a bounded timeout on every storage call.

pub mod store;

pub use store::MessageStore;
