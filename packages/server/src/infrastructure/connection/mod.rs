//! Per-connection tasks.
//!
//! Each joined connection runs two independent loops:
//!
//! - [`InboundLoop`]: transport → validation → room broadcast queue
//! - [`OutboundLoop`]: outbound queue → transport, plus keepalive
//!
//! [`spawn_connection`] starts both and tears the pair down together: when
//! the reader ends it unregisters from the room, which closes the outbound
//! queue and lets the writer send a close frame; when the writer ends first
//! the reader is told to stop and unregister.

mod inbound;
mod outbound;

use std::{fmt::Display, sync::Arc};

use axum::extract::ws::Message;
use futures_util::{Sink, Stream};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time,
};

use crate::{config::HubConfig, domain::DisplayName};

use super::hub::{ConnectionId, Payload, RoomHandle};

pub use inbound::{InboundExit, InboundLoop, InboundStop};
pub use outbound::{OutboundExit, OutboundLoop};

/// How a connection ended, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub id: ConnectionId,
    pub inbound: Option<InboundExit>,
    pub outbound: Option<OutboundExit>,
}

/// Start the inbound and outbound loops of an already registered connection.
pub fn spawn_connection<W, R, E>(
    id: ConnectionId,
    author: DisplayName,
    room: RoomHandle,
    config: Arc<HubConfig>,
    sink: W,
    stream: R,
    queue: mpsc::Receiver<Payload>,
) -> JoinHandle<ConnectionSummary>
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display + Send,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let room_name = room.name().clone();
    let (stop_tx, stop_rx) = oneshot::channel();

    let mut outbound =
        tokio::spawn(OutboundLoop::new(id, config.clone()).run(sink, queue));
    let mut inbound =
        tokio::spawn(InboundLoop::new(id, author, room, config.clone()).run(stream, stop_rx));

    tokio::spawn(async move {
        let summary = tokio::select! {
            inbound_exit = &mut inbound => {
                let inbound_exit = inbound_exit.ok();
                let unregistered = inbound_exit.as_ref().is_some_and(|e| e.unregistered);
                // The room closes our queue once it processes the unregister;
                // give the writer one write deadline to send the close frame.
                let outbound_exit = if unregistered {
                    match time::timeout(config.write_timeout, &mut outbound).await {
                        Ok(joined) => joined.ok(),
                        Err(_) => {
                            outbound.abort();
                            None
                        }
                    }
                } else {
                    outbound.abort();
                    None
                };
                ConnectionSummary { id, inbound: inbound_exit, outbound: outbound_exit }
            }
            outbound_exit = &mut outbound => {
                let _ = stop_tx.send(());
                ConnectionSummary {
                    id,
                    inbound: inbound.await.ok(),
                    outbound: outbound_exit.ok(),
                }
            }
        };

        tracing::info!(
            room = %room_name,
            connection_id = %id,
            inbound = ?summary.inbound.as_ref().map(|e| &e.reason),
            outbound = ?summary.outbound,
            "connection closed"
        );
        summary
    })
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::{test_support::*, *};
    use crate::{domain::RoomName, infrastructure::hub::Member};

    async fn joined(
        room: &RoomHandle,
        config: &Arc<HubConfig>,
    ) -> (
        mpsc::UnboundedSender<Result<Message, String>>,
        mpsc::UnboundedReceiver<Message>,
        JoinHandle<ConnectionSummary>,
    ) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(config.connection_outbound_queue_capacity);
        room.register(Member { id, outbound: tx }, config.register_timeout)
            .await
            .unwrap();
        let (frames, stream) = channel_stream();
        let (sink, written) = channel_sink();
        let task = spawn_connection(
            id,
            DisplayName::new("A"),
            room.clone(),
            config.clone(),
            sink,
            stream,
            rx,
        );
        (frames, written, task)
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_close_unregisters_and_sends_close_frame() {
        // テスト項目: ピアが切断すると unregister され、Close フレームを送って終了する
        // given (前提条件):
        let config = Arc::new(HubConfig::default());
        let room = RoomHandle::spawn(RoomName::new("r1"), &config);
        let (frames, mut written, task) = joined(&room, &config).await;
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(room.viewers(), 1);

        // when (操作):
        drop(frames);
        let summary = task.await.unwrap();

        // then (期待する結果):
        assert_eq!(summary.inbound.unwrap().reason, InboundStop::PeerClosed);
        assert_eq!(summary.outbound, Some(OutboundExit::QueueClosed));
        assert_eq!(room.viewers(), 0);
        let frames: Vec<Message> = std::iter::from_fn(|| written.try_recv().ok()).collect();
        assert!(matches!(frames.last(), Some(Message::Close(None))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mass_teardown_with_saturated_control_queue() {
        // テスト項目: 20 接続が同時に切断しても unregister_timeout 内に全て終了し、残ったメンバーへの配信は止まらない
        // given (前提条件):
        let config = Arc::new(HubConfig {
            room_control_queue_capacity: 1,
            ..HubConfig::default()
        });
        let room = RoomHandle::spawn(RoomName::new("r1"), &config);
        let (survivor_tx, mut survivor) = mpsc::channel(config.connection_outbound_queue_capacity);
        room.register(
            Member {
                id: Uuid::new_v4(),
                outbound: survivor_tx,
            },
            config.register_timeout,
        )
        .await
        .unwrap();

        let mut frames = Vec::new();
        let mut written = Vec::new();
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let (f, w, t) = joined(&room, &config).await;
            frames.push(f);
            written.push(w);
            tasks.push(t);
        }
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(room.viewers(), 21);

        // when (操作):
        let started = time::Instant::now();
        drop(frames);
        room.try_broadcast(Payload::from("still-here")).unwrap();
        let mut summaries = Vec::new();
        for task in tasks {
            summaries.push(task.await.unwrap());
        }
        let elapsed = started.elapsed();

        // then (期待する結果):
        assert!(elapsed <= config.unregister_timeout, "elapsed: {elapsed:?}");
        for summary in &summaries {
            let inbound = summary.inbound.as_ref().unwrap();
            assert_eq!(inbound.reason, InboundStop::PeerClosed);
            assert!(inbound.unregistered);
            assert_eq!(summary.outbound, Some(OutboundExit::QueueClosed));
        }
        assert_eq!(room.viewers(), 1);
        let delivered: Vec<String> = std::iter::from_fn(|| survivor.try_recv().ok())
            .map(|p| p.to_string())
            .collect();
        assert!(delivered.iter().any(|p| p == "still-here"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_writer_failure_stops_reader() {
        // テスト項目: 書き込み側が失敗すると受信側も終了し、ルームから外れる
        // given (前提条件):
        let config = Arc::new(HubConfig::default());
        let room = RoomHandle::spawn(RoomName::new("r1"), &config);
        let (_frames, written, task) = joined(&room, &config).await;
        drop(written);
        time::sleep(Duration::from_millis(1)).await;

        // when (操作):
        room.try_broadcast(Payload::from("hello")).unwrap();
        let summary = time::timeout(Duration::from_secs(5), task)
            .await
            .expect("connection should shut down")
            .unwrap();
        time::sleep(Duration::from_millis(1)).await;

        // then (期待する結果):
        assert!(matches!(summary.outbound, Some(OutboundExit::WriteFailed(_))));
        assert_eq!(summary.inbound.unwrap().reason, InboundStop::Stopped);
        assert_eq!(room.viewers(), 0);
    }
}
