//! Validation errors for inbound frames.
//!
//! These never reach the client: the inbound loop logs them at debug level
//! and discards the frame.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text is empty after trimming")]
    EmptyText,

    #[error("text has {actual} code points, limit is {max}")]
    TextTooLong { max: usize, actual: usize },

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("unsupported message type '{0}'")]
    UnsupportedType(String),
}
