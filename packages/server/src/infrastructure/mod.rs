//! Infrastructure layer: the in-process broadcast machinery.
//!
//! - `hub`: room registry and the per-room control loop
//! - `connection`: inbound / outbound loops bound to one transport
//! - `dto`: HTTP response bodies

pub mod connection;
pub mod dto;
pub mod hub;
