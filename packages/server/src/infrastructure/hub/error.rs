use std::time::Duration;

use thiserror::Error;

/// Failure of a bounded register/unregister request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomRequestError {
    #[error("room '{room}' did not accept the request within {timeout:?}")]
    Timeout { room: String, timeout: Duration },

    #[error("room '{room}' is no longer running")]
    Closed { room: String },
}

/// Why a payload could not be queued for room-wide fan-out.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum BroadcastRejected {
    #[error("room broadcast queue is full")]
    Full,

    #[error("room is no longer running")]
    Closed,
}
