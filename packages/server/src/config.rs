//! Tunables for the room broadcast core.

use std::time::Duration;

use thiserror::Error;

/// Room used when a client does not name one.
pub const DEFAULT_ROOM_NAME: &str = "esimde-live";

/// Display name used when a client does not supply one.
pub const DEFAULT_AUTHOR: &str = "Guest";

/// Configuration errors detected by [`HubConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("keepalive interval ({keepalive:?}) must be shorter than peer timeout ({peer:?})")]
    KeepaliveTooLong { keepalive: Duration, peer: Duration },
}

/// Limits, queue capacities and timers shared by every room and connection.
#[derive(Debug, Clone, PartialEq)]
pub struct HubConfig {
    /// Hard cap on inbound frame bytes.
    pub max_frame_size: usize,
    /// Cap on sanitized chat text, in Unicode code points.
    pub max_text_length: usize,
    /// Token bucket refill rate and burst capacity.
    pub max_messages_per_second: u32,
    pub room_broadcast_queue_capacity: usize,
    pub room_control_queue_capacity: usize,
    pub connection_outbound_queue_capacity: usize,
    pub presence_debounce_interval: Duration,
    pub register_timeout: Duration,
    pub unregister_timeout: Duration,
    /// Terminate a connection whose message could not be forwarded because
    /// the room queue is full, instead of dropping the message.
    pub drop_on_broadcast_overload: bool,
    pub write_timeout: Duration,
    pub peer_timeout: Duration,
    /// Upper bound of extra queued messages written per wakeup.
    pub outbound_batch_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 512,
            max_text_length: 50,
            max_messages_per_second: 3,
            room_broadcast_queue_capacity: 8192,
            room_control_queue_capacity: 16,
            connection_outbound_queue_capacity: 64,
            presence_debounce_interval: Duration::from_millis(500),
            register_timeout: Duration::from_secs(2),
            unregister_timeout: Duration::from_secs(2),
            drop_on_broadcast_overload: false,
            write_timeout: Duration::from_secs(10),
            peer_timeout: Duration::from_secs(60),
            outbound_batch_size: 32,
        }
    }
}

impl HubConfig {
    /// Heartbeat period: 9/10 of the peer timeout.
    pub fn keepalive_interval(&self) -> Duration {
        self.peer_timeout * 9 / 10
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("max_frame_size", self.max_frame_size),
            ("max_text_length", self.max_text_length),
            ("max_messages_per_second", self.max_messages_per_second as usize),
            (
                "room_broadcast_queue_capacity",
                self.room_broadcast_queue_capacity,
            ),
            ("room_control_queue_capacity", self.room_control_queue_capacity),
            (
                "connection_outbound_queue_capacity",
                self.connection_outbound_queue_capacity,
            ),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero(name));
        }

        let durations = [
            ("presence_debounce_interval", self.presence_debounce_interval),
            ("register_timeout", self.register_timeout),
            ("unregister_timeout", self.unregister_timeout),
            ("write_timeout", self.write_timeout),
            ("peer_timeout", self.peer_timeout),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, value)| value.is_zero()) {
            return Err(ConfigError::Zero(name));
        }

        let keepalive = self.keepalive_interval();
        if keepalive.is_zero() || keepalive >= self.peer_timeout {
            return Err(ConfigError::KeepaliveTooLong {
                keepalive,
                peer: self.peer_timeout,
            });
        }

        Ok(())
    }
}
