//! UseCase layer: the operations the UI layer exposes.

mod error;
mod join_room;
mod list_rooms;

pub use error::JoinError;
pub use join_room::{JoinRoomUseCase, JoinedConnection};
pub use list_rooms::{ListRoomsUseCase, RoomSummary};
