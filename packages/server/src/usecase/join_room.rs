//! UseCase: join a room over an upgraded connection.
//!
//! This is the single entry point of the broadcast core. It resolves the
//! room, registers a fresh connection with a bounded wait and then hands
//! the transport to the connection's inbound and outbound loops. All later
//! activity is asynchronous.

use std::{fmt::Display, sync::Arc};

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream};
use tokio::{sync::mpsc, task::JoinHandle, time};
use uuid::Uuid;

use crate::{
    config::HubConfig,
    domain::{DisplayName, RoomName},
    infrastructure::{
        connection::{ConnectionSummary, spawn_connection},
        hub::{ConnectionId, Member, Registry, RoomHandle, RoomRequestError},
    },
};

use super::error::JoinError;

impl From<RoomRequestError> for JoinError {
    fn from(e: RoomRequestError) -> Self {
        match e {
            RoomRequestError::Timeout { room, timeout } => Self::RegisterTimeout { room, timeout },
            RoomRequestError::Closed { room } => Self::RoomClosed { room },
        }
    }
}

/// A connection that joined its room. Awaiting `task` yields how it ended.
#[derive(Debug)]
pub struct JoinedConnection {
    pub id: ConnectionId,
    pub room: RoomName,
    pub task: JoinHandle<ConnectionSummary>,
}

pub struct JoinRoomUseCase {
    registry: Arc<Registry>,
    config: Arc<HubConfig>,
}

impl JoinRoomUseCase {
    pub fn new(registry: Arc<Registry>) -> Self {
        let config = registry.config().clone();
        Self { registry, config }
    }

    /// Join `room_name` as `author` using the two halves of an upgraded
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns [`JoinError`] if the room does not accept the registration
    /// within `register_timeout`; the transport is closed before returning.
    pub async fn execute<W, R, E>(
        &self,
        sink: W,
        stream: R,
        room_name: RoomName,
        author: DisplayName,
    ) -> Result<JoinedConnection, JoinError>
    where
        W: Sink<Message> + Unpin + Send + 'static,
        W::Error: Display + Send,
        R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
        E: Display + Send + 'static,
    {
        let room = self.registry.get_or_create(&room_name).await;
        self.attach(room, sink, stream, author).await
    }

    pub(crate) async fn attach<W, R, E>(
        &self,
        room: RoomHandle,
        mut sink: W,
        stream: R,
        author: DisplayName,
    ) -> Result<JoinedConnection, JoinError>
    where
        W: Sink<Message> + Unpin + Send + 'static,
        W::Error: Display + Send,
        R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
        E: Display + Send + 'static,
    {
        let id = Uuid::new_v4();
        let (outbound, queue) = mpsc::channel(self.config.connection_outbound_queue_capacity);

        if let Err(e) = room
            .register(Member { id, outbound }, self.config.register_timeout)
            .await
        {
            tracing::warn!(room = %room.name(), author = %author, "join aborted: {}", e);
            let _ = time::timeout(self.config.write_timeout, async {
                let _ = sink.send(Message::Close(None)).await;
                let _ = sink.close().await;
            })
            .await;
            drop(stream);
            return Err(e.into());
        }

        tracing::info!(
            room = %room.name(),
            connection_id = %id,
            author = %author,
            "connection joined"
        );

        let room_name = room.name().clone();
        let task = spawn_connection(
            id,
            author,
            room,
            self.config.clone(),
            sink,
            stream,
            queue,
        );

        Ok(JoinedConnection {
            id,
            room: room_name,
            task,
        })
    }
}
