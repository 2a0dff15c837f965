//! Inbound ("read") side of a connection.
//!
//! Pulls frames from the transport, enforces the frame cap and token bucket,
//! validates chat frames and offers them to the room's broadcast queue.
//! Validation failures and rate-limited frames are dropped silently.
//! Whatever ends the loop, it finishes by asking the room to unregister
//! this connection with a bounded wait.

use std::{fmt::Display, sync::Arc};

use axum::extract::ws::Message;
use futures_util::{Stream, StreamExt};
use tokio::{sync::oneshot, time};

use crate::{
    config::HubConfig,
    domain::{DisplayName, InboundChat, TokenBucket, WireMessage},
    infrastructure::hub::{BroadcastRejected, ConnectionId, Payload, RoomHandle},
};

/// Why the inbound loop stopped reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundStop {
    /// Stream ended or the peer sent a close frame.
    PeerClosed,
    TransportError(String),
    PeerTimeout,
    FrameTooLarge(usize),
    /// Room broadcast queue was full and the overload policy terminates.
    RoomOverloaded,
    RoomClosed,
    /// The outbound side ended first.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundExit {
    pub reason: InboundStop,
    /// Whether the unregister request reached the room's queue in time.
    pub unregistered: bool,
}

enum Flow {
    Continue,
    Stop(InboundStop),
}

pub struct InboundLoop {
    id: ConnectionId,
    author: DisplayName,
    room: RoomHandle,
    config: Arc<HubConfig>,
    bucket: TokenBucket,
}

impl InboundLoop {
    pub fn new(
        id: ConnectionId,
        author: DisplayName,
        room: RoomHandle,
        config: Arc<HubConfig>,
    ) -> Self {
        let bucket = TokenBucket::new(config.max_messages_per_second);
        Self {
            id,
            author,
            room,
            config,
            bucket,
        }
    }

    /// Read until the transport ends or `stop` fires, then unregister.
    pub async fn run<R, E>(mut self, mut stream: R, mut stop: oneshot::Receiver<()>) -> InboundExit
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let reason = loop {
            let next = tokio::select! {
                _ = &mut stop => break InboundStop::Stopped,
                next = time::timeout(self.config.peer_timeout, stream.next()) => next,
            };

            let frame = match next {
                Err(_) => break InboundStop::PeerTimeout,
                Ok(None) => break InboundStop::PeerClosed,
                Ok(Some(Err(e))) => break InboundStop::TransportError(e.to_string()),
                Ok(Some(Ok(frame))) => frame,
            };

            let flow = match frame {
                Message::Text(text) => self.handle_text(text.as_str()),
                Message::Binary(bytes) if bytes.len() > self.config.max_frame_size => {
                    Flow::Stop(InboundStop::FrameTooLarge(bytes.len()))
                }
                Message::Binary(_) => {
                    tracing::trace!(connection_id = %self.id, "binary frame ignored");
                    Flow::Continue
                }
                // Any control frame counts as peer activity; the timeout
                // restarts on the next iteration.
                Message::Ping(_) | Message::Pong(_) => Flow::Continue,
                Message::Close(_) => Flow::Stop(InboundStop::PeerClosed),
            };

            if let Flow::Stop(reason) = flow {
                break reason;
            }
        };

        tracing::debug!(
            room = %self.room.name(),
            connection_id = %self.id,
            reason = ?reason,
            "inbound loop finished"
        );

        let unregistered = match self
            .room
            .unregister(self.id, self.config.unregister_timeout)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(connection_id = %self.id, "unregister failed: {}", e);
                false
            }
        };

        InboundExit {
            reason,
            unregistered,
        }
    }

    fn handle_text(&mut self, text: &str) -> Flow {
        if text.len() > self.config.max_frame_size {
            return Flow::Stop(InboundStop::FrameTooLarge(text.len()));
        }

        if !self.bucket.try_acquire() {
            tracing::trace!(connection_id = %self.id, "rate limited, frame dropped");
            return Flow::Continue;
        }

        let chat = match InboundChat::parse(text).and_then(|inbound| {
            inbound.into_chat(&self.author, self.room.name(), self.config.max_text_length)
        }) {
            Ok(chat) => chat,
            Err(e) => {
                tracing::debug!(connection_id = %self.id, "frame discarded: {}", e);
                return Flow::Continue;
            }
        };

        let payload = match WireMessage::Chat(chat).to_json() {
            Ok(json) => Payload::from(json),
            Err(e) => {
                tracing::error!(connection_id = %self.id, "failed to serialize chat: {}", e);
                return Flow::Continue;
            }
        };

        match self.room.try_broadcast(payload) {
            Ok(()) => Flow::Continue,
            Err(BroadcastRejected::Full) if self.config.drop_on_broadcast_overload => {
                tracing::warn!(
                    room = %self.room.name(),
                    connection_id = %self.id,
                    "room broadcast queue full, closing connection"
                );
                Flow::Stop(InboundStop::RoomOverloaded)
            }
            Err(BroadcastRejected::Full) => {
                tracing::debug!(
                    room = %self.room.name(),
                    connection_id = %self.id,
                    "room broadcast queue full, message dropped"
                );
                Flow::Continue
            }
            Err(BroadcastRejected::Closed) => Flow::Stop(InboundStop::RoomClosed),
        }
    }
}
