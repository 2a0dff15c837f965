//! UseCase errors.

use std::time::Duration;

use thiserror::Error;

/// Failure of the join entry point. The transport has already been closed
/// when this is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("room '{room}' did not accept the registration within {timeout:?}")]
    RegisterTimeout { room: String, timeout: Duration },

    #[error("room '{room}' is no longer running")]
    RoomClosed { room: String },
}
