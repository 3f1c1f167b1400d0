//! Consultation lifecycle and billing.
//!
//! `transition` holds the pure state machine and billing math; `registry`
//! pairs it with the repository ports and participant checks.

pub mod registry;
pub mod transition;

pub use registry::{ConsultationDetail, SessionRegistry};
