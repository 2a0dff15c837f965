//! Data Transfer Objects for the HTTP API.
//!
//! WebSocket frames are modelled directly by `domain::message`; only the
//! read-only HTTP endpoints need separate response shapes.

pub mod http;
