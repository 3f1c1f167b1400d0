//! Port definitions.
//!
//! These traits define the storage and collaborator interfaces that the
//! infrastructure layer (astroconsult-infra) implements. The core crate never
//! depends on any specific storage technology.

pub mod consultation;
pub mod directory;
pub mod identity;
pub mod message;
