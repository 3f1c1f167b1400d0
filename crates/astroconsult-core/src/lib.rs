//! Business logic and port (repository trait) definitions for the live
//! consultation service.
//!
//! This crate defines the ports that the infrastructure layer implements and
//! the services built on them: the session registry (lifecycle + billing),
//! the message store, the room broadcast fabric, and the per-connection chat
//! gateway. It depends only on `astroconsult-types` -- never on
//! `astroconsult-infra` or any database/IO crate.

pub mod chat;
pub mod consultation;
pub mod gateway;
pub mod repository;
pub mod room;

#[cfg(test)]
pub(crate) mod testing;
