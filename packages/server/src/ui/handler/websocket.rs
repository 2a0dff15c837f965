//! WebSocket connection handler.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::stream::StreamExt;
use serde::Deserialize;

use crate::{
    domain::{DisplayName, RoomName},
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub room: Option<String>,
    pub author: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    let room = RoomName::from_optional(query.room.as_deref());
    let author = DisplayName::from_optional(query.author.as_deref());
    let max_frame_size = state.config.max_frame_size;

    tracing::debug!(room = %room, author = %author, "websocket upgrade requested");

    ws.max_message_size(max_frame_size)
        .max_frame_size(max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, room, author))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room: RoomName, author: DisplayName) {
    let (sender, receiver) = socket.split();

    match state
        .join_room_usecase
        .execute(sender, receiver, room, author)
        .await
    {
        Ok(joined) => {
            tracing::debug!(room = %joined.room, connection_id = %joined.id, "socket handed to room");
        }
        Err(e) => {
            tracing::warn!("Failed to join room: {}", e);
        }
    }
}
