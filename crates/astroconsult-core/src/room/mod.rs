//! Per-consultation broadcast rooms.

pub mod fabric;

pub use fabric::{ConnectionId, DeliveryError, DeliveryReport, RoomFabric, RoomMember};
