//! Outbound ("write") side of a connection.
//!
//! Drains the connection's outbound queue into the transport and sends a
//! heartbeat ping on every keepalive tick. Each write (a message plus any
//! opportunistically batched followers) runs under the write deadline.
//! When the room closes the queue the loop sends a close frame and ends.

use std::{fmt::Display, sync::Arc, time::Duration};

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use tokio::{
    sync::mpsc::{self, error::TryRecvError},
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    config::HubConfig,
    infrastructure::hub::{ConnectionId, Payload},
};

/// Why the outbound loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundExit {
    /// The room closed the outbound queue (unregistered or sacrificed).
    QueueClosed,
    WriteFailed(String),
    WriteTimeout,
}

pub struct OutboundLoop {
    id: ConnectionId,
    config: Arc<HubConfig>,
}

impl OutboundLoop {
    pub fn new(id: ConnectionId, config: Arc<HubConfig>) -> Self {
        Self { id, config }
    }

    pub async fn run<S>(self, mut sink: S, mut queue: mpsc::Receiver<Payload>) -> OutboundExit
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
    {
        let period = self.config.keepalive_interval();
        let mut keepalive = time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            tokio::select! {
                next = queue.recv() => match next {
                    Some(payload) => {
                        if let Err(exit) = self.write_batch(&mut sink, payload, &mut queue).await {
                            break exit;
                        }
                    }
                    None => {
                        let _ = self.write(&mut sink, Message::Close(None)).await;
                        break OutboundExit::QueueClosed;
                    }
                },
                // Ping on every tick, busy or not: a listener that never
                // writes must still answer with pongs to stay alive.
                _ = keepalive.tick() => {
                    if let Err(exit) = self.write(&mut sink, Message::Ping(Default::default())).await {
                        break exit;
                    }
                }
            }
        };

        let _ = time::timeout(self.config.write_timeout, sink.close()).await;
        tracing::debug!(connection_id = %self.id, exit = ?exit, "outbound loop finished");
        exit
    }

    /// Write `first` plus up to `outbound_batch_size` already-queued
    /// payloads, then flush once.
    async fn write_batch<S>(
        &self,
        sink: &mut S,
        first: Payload,
        queue: &mut mpsc::Receiver<Payload>,
    ) -> Result<(), OutboundExit>
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
    {
        let batch_size = self.config.outbound_batch_size;
        let written = time::timeout(self.config.write_timeout, async {
            sink.feed(text_frame(&first)).await?;
            for _ in 0..batch_size {
                match queue.try_recv() {
                    Ok(payload) => sink.feed(text_frame(&payload)).await?,
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                }
            }
            sink.flush().await
        })
        .await;
        settle(written, self.config.write_timeout)
    }

    async fn write<S>(&self, sink: &mut S, frame: Message) -> Result<(), OutboundExit>
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
    {
        let written = time::timeout(self.config.write_timeout, sink.send(frame)).await;
        settle(written, self.config.write_timeout)
    }
}

fn text_frame(payload: &Payload) -> Message {
    Message::Text(payload.to_string().into())
}

fn settle<E: Display>(
    written: Result<Result<(), E>, time::error::Elapsed>,
    deadline: Duration,
) -> Result<(), OutboundExit> {
    match written {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(OutboundExit::WriteFailed(e.to_string())),
        Err(_) => {
            tracing::debug!("write exceeded deadline of {:?}", deadline);
            Err(OutboundExit::WriteTimeout)
        }
    }
}
