//! Shared handler state.

use std::sync::Arc;

use crate::{
    config::HubConfig,
    usecase::{JoinRoomUseCase, ListRoomsUseCase},
};

/// Shared application state
pub struct AppState {
    /// JoinRoomUseCase（ルーム参加のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// ListRoomsUseCase（ルーム一覧取得のユースケース）
    pub list_rooms_usecase: Arc<ListRoomsUseCase>,
    /// Frame limits applied at upgrade time
    pub config: Arc<HubConfig>,
}
