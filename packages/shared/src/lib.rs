//! Utilities shared by the Roomcast server binary and its tests.

pub mod logger;
pub mod time;
