//! Real-time room broadcast server.
//!
//! Clients join a named room over WebSocket, send short chat messages that
//! are fanned out to every member of the room, and receive debounced
//! presence (viewer count) updates. Each room is a single task owning its
//! membership; each connection runs a reader and a writer task joined to the
//! room through bounded queues.

pub mod config;

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
