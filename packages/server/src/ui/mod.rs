//! Axum front end: WebSocket upgrade plus a small read-only HTTP API.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use signal::shutdown_signal;
