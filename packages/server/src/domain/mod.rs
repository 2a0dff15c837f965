//! Domain layer: wire messages, validated value objects and rate limiting.
//!
//! Nothing in here performs I/O; the room and connection loops in the
//! infrastructure layer call into these types.

pub mod error;
pub mod message;
pub mod rate_limit;
pub mod value_object;

pub use error::ValidationError;
pub use message::{ChatMessage, InboundChat, PresenceMessage, WireMessage};
pub use rate_limit::TokenBucket;
pub use value_object::{ChatText, DisplayName, RoomName};
