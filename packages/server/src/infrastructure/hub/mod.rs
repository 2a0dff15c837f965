//! Room registry and room control loop.
//!
//! The registry owns room *existence*; each room's loop owns room
//! *membership*. Everything outside a room talks to it through the bounded
//! queues on [`RoomHandle`].

mod error;
mod registry;
mod room;

pub use error::{BroadcastRejected, RoomRequestError};
pub use registry::Registry;
pub use room::{ConnectionId, Member, Payload, RoomHandle, RoomLoop};
