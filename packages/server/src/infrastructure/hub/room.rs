//! Room control loop.
//!
//! A room is one tokio task that exclusively owns its member set. Register,
//! unregister and broadcast requests arrive on three bounded queues and are
//! serviced one at a time, so every membership change and every fan-out
//! within a room is totally ordered without locking.
//!
//! ## Backpressure
//!
//! Fan-out never waits on a member: each payload is offered with
//! `try_send`. A member whose outbound queue is full (or already closed) is
//! removed on the spot and its queue is closed by dropping the sender.
//!
//! ## Presence
//!
//! Membership changes only mark the room dirty. A fixed ticker emits at most
//! one presence snapshot per interval, so a burst of joins and leaves
//! collapses into a single update.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::{self, Instant, MissedTickBehavior},
};
use uuid::Uuid;

use roomcast_shared::time::unix_millis;

use crate::{
    config::HubConfig,
    domain::{PresenceMessage, RoomName, WireMessage},
};

use super::error::{BroadcastRejected, RoomRequestError};

/// Identity of one joined connection. Never reused.
pub type ConnectionId = Uuid;

/// A serialized outbound frame, shared by every member it is fanned out to.
pub type Payload = Arc<str>;

/// Registration request: the connection's identity plus the producer side
/// of its outbound queue. Once registered, the room holds the only sender.
#[derive(Debug)]
pub struct Member {
    pub id: ConnectionId,
    pub outbound: mpsc::Sender<Payload>,
}

/// Cloneable front door of a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    name: RoomName,
    created_at: i64,
    viewers: Arc<AtomicUsize>,
    register_tx: mpsc::Sender<Member>,
    unregister_tx: mpsc::Sender<ConnectionId>,
    broadcast_tx: mpsc::Sender<Payload>,
}

impl RoomHandle {
    /// Create a room and start its control loop on the current runtime.
    pub fn spawn(name: RoomName, config: &HubConfig) -> Self {
        let (handle, room_loop) = Self::new(name, config);
        tokio::spawn(room_loop.run());
        handle
    }

    /// Create a room without starting its loop.
    pub fn new(name: RoomName, config: &HubConfig) -> (Self, RoomLoop) {
        let (register_tx, register_rx) = mpsc::channel(config.room_control_queue_capacity);
        let (unregister_tx, unregister_rx) = mpsc::channel(config.room_control_queue_capacity);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(config.room_broadcast_queue_capacity);
        let viewers = Arc::new(AtomicUsize::new(0));

        let handle = Self {
            name: name.clone(),
            created_at: unix_millis(),
            viewers: viewers.clone(),
            register_tx,
            unregister_tx,
            broadcast_tx,
        };
        let room_loop = RoomLoop {
            name,
            members: HashMap::new(),
            presence_dirty: false,
            presence_interval: config.presence_debounce_interval,
            viewers,
            register_rx,
            unregister_rx,
            broadcast_rx,
        };
        (handle, room_loop)
    }

    pub fn name(&self) -> &RoomName {
        &self.name
    }

    /// Creation time, Unix milliseconds.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Member count as last published by the room loop.
    pub fn viewers(&self) -> usize {
        self.viewers.load(Ordering::Relaxed)
    }

    /// Queue a registration, waiting at most `timeout` for queue space.
    pub async fn register(&self, member: Member, timeout: Duration) -> Result<(), RoomRequestError> {
        match time::timeout(timeout, self.register_tx.send(member)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(self.closed()),
            Err(_) => Err(self.timed_out(timeout)),
        }
    }

    /// Queue an unregistration, waiting at most `timeout` for queue space.
    pub async fn unregister(
        &self,
        id: ConnectionId,
        timeout: Duration,
    ) -> Result<(), RoomRequestError> {
        match time::timeout(timeout, self.unregister_tx.send(id)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(self.closed()),
            Err(_) => Err(self.timed_out(timeout)),
        }
    }

    /// Offer a payload for fan-out without waiting.
    pub fn try_broadcast(&self, payload: Payload) -> Result<(), BroadcastRejected> {
        self.broadcast_tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => BroadcastRejected::Full,
            TrySendError::Closed(_) => BroadcastRejected::Closed,
        })
    }

    fn closed(&self) -> RoomRequestError {
        RoomRequestError::Closed {
            room: self.name.as_str().to_string(),
        }
    }

    fn timed_out(&self, timeout: Duration) -> RoomRequestError {
        RoomRequestError::Timeout {
            room: self.name.as_str().to_string(),
            timeout,
        }
    }
}

enum RoomEvent {
    Register(Member),
    Unregister(ConnectionId),
    Broadcast(Payload),
    PresenceTick,
}

/// State owned by the room task. Only [`RoomLoop::run`] touches `members`.
pub struct RoomLoop {
    name: RoomName,
    members: HashMap<ConnectionId, mpsc::Sender<Payload>>,
    presence_dirty: bool,
    presence_interval: Duration,
    viewers: Arc<AtomicUsize>,
    register_rx: mpsc::Receiver<Member>,
    unregister_rx: mpsc::Receiver<ConnectionId>,
    broadcast_rx: mpsc::Receiver<Payload>,
}

impl RoomLoop {
    /// Serve events until every [`RoomHandle`] is dropped.
    pub async fn run(mut self) {
        let mut presence = time::interval_at(
            Instant::now() + self.presence_interval,
            self.presence_interval,
        );
        presence.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(room = %self.name, "room loop started");

        loop {
            let event = tokio::select! {
                member = self.register_rx.recv() => member.map(RoomEvent::Register),
                id = self.unregister_rx.recv() => id.map(RoomEvent::Unregister),
                payload = self.broadcast_rx.recv() => payload.map(RoomEvent::Broadcast),
                _ = presence.tick() => Some(RoomEvent::PresenceTick),
            };

            // The handles own all three senders, so one closed queue means
            // every handle is gone.
            let Some(event) = event else { break };

            match event {
                RoomEvent::Register(member) => self.register(member),
                RoomEvent::Unregister(id) => self.unregister(id),
                RoomEvent::Broadcast(payload) => self.fan_out(&payload),
                RoomEvent::PresenceTick => self.flush_presence(),
            }
        }

        tracing::debug!(room = %self.name, "room loop stopped");
    }

    fn register(&mut self, member: Member) {
        self.members.insert(member.id, member.outbound);
        self.membership_changed();
        tracing::debug!(
            room = %self.name,
            connection_id = %member.id,
            members = self.members.len(),
            "member registered"
        );
    }

    fn unregister(&mut self, id: ConnectionId) {
        // Dropping the sender closes the member's outbound queue.
        if self.members.remove(&id).is_some() {
            self.membership_changed();
            tracing::debug!(
                room = %self.name,
                connection_id = %id,
                members = self.members.len(),
                "member unregistered"
            );
        }
    }

    fn fan_out(&mut self, payload: &Payload) {
        let mut sacrificed = Vec::new();
        for (id, outbound) in &self.members {
            match outbound.try_send(payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        room = %self.name,
                        connection_id = %id,
                        "outbound queue full, dropping slow member"
                    );
                    sacrificed.push(*id);
                }
                Err(TrySendError::Closed(_)) => sacrificed.push(*id),
            }
        }

        if !sacrificed.is_empty() {
            for id in sacrificed {
                self.members.remove(&id);
            }
            self.membership_changed();
        }
    }

    fn flush_presence(&mut self) {
        if !self.presence_dirty {
            return;
        }
        self.presence_dirty = false;

        let snapshot = WireMessage::Presence(PresenceMessage::new(&self.name, self.members.len()));
        match snapshot.to_json() {
            Ok(json) => {
                tracing::trace!(room = %self.name, viewers = self.members.len(), "presence");
                self.fan_out(&Payload::from(json));
            }
            Err(e) => tracing::error!(room = %self.name, "failed to serialize presence: {}", e),
        }
    }

    fn membership_changed(&mut self) {
        self.presence_dirty = true;
        self.viewers.store(self.members.len(), Ordering::Relaxed);
    }

    /// Pop a queued broadcast without running the loop.
    #[cfg(test)]
    pub(crate) fn try_next_broadcast(&mut self) -> Option<Payload> {
        self.broadcast_rx.try_recv().ok()
    }
}
