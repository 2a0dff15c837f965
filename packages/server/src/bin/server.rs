//! Room broadcast server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roomcast-server
//! cargo run --bin roomcast-server -- --host 0.0.0.0 --port 3000 --max-messages-per-second 5
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use roomcast_server::{
    config::HubConfig,
    infrastructure::hub::Registry,
    ui::Server,
    usecase::{JoinRoomUseCase, ListRoomsUseCase},
};
use roomcast_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "roomcast-server")]
#[command(about = "Real-time room broadcast server over WebSocket", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "ROOMCAST_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "ROOMCAST_PORT", default_value = "8080")]
    port: u16,

    /// Maximum inbound frame size in bytes
    #[arg(long, env = "ROOMCAST_MAX_FRAME_SIZE", default_value = "512")]
    max_frame_size: usize,

    /// Maximum chat text length in characters
    #[arg(long, env = "ROOMCAST_MAX_TEXT_LENGTH", default_value = "50")]
    max_text_length: usize,

    /// Per-connection message rate (also the burst size)
    #[arg(long, env = "ROOMCAST_MAX_MESSAGES_PER_SECOND", default_value = "3")]
    max_messages_per_second: u32,

    #[arg(long, env = "ROOMCAST_ROOM_BROADCAST_QUEUE_CAPACITY", default_value = "8192")]
    room_broadcast_queue_capacity: usize,

    #[arg(long, env = "ROOMCAST_ROOM_CONTROL_QUEUE_CAPACITY", default_value = "16")]
    room_control_queue_capacity: usize,

    #[arg(long, env = "ROOMCAST_CONNECTION_OUTBOUND_QUEUE_CAPACITY", default_value = "64")]
    connection_outbound_queue_capacity: usize,

    /// Presence debounce interval in milliseconds
    #[arg(long, env = "ROOMCAST_PRESENCE_DEBOUNCE_MS", default_value = "500")]
    presence_debounce_ms: u64,

    #[arg(long, env = "ROOMCAST_REGISTER_TIMEOUT_MS", default_value = "2000")]
    register_timeout_ms: u64,

    #[arg(long, env = "ROOMCAST_UNREGISTER_TIMEOUT_MS", default_value = "2000")]
    unregister_timeout_ms: u64,

    /// Close a connection whose message hits a full room queue instead of dropping the message
    #[arg(long, env = "ROOMCAST_DROP_ON_BROADCAST_OVERLOAD")]
    drop_on_broadcast_overload: bool,

    #[arg(long, env = "ROOMCAST_WRITE_TIMEOUT_MS", default_value = "10000")]
    write_timeout_ms: u64,

    /// Close connections silent for this long; pings go out at 9/10 of it
    #[arg(long, env = "ROOMCAST_PEER_TIMEOUT_MS", default_value = "60000")]
    peer_timeout_ms: u64,

    #[arg(long, env = "ROOMCAST_OUTBOUND_BATCH_SIZE", default_value = "32")]
    outbound_batch_size: usize,
}

impl Args {
    fn hub_config(&self) -> HubConfig {
        HubConfig {
            max_frame_size: self.max_frame_size,
            max_text_length: self.max_text_length,
            max_messages_per_second: self.max_messages_per_second,
            room_broadcast_queue_capacity: self.room_broadcast_queue_capacity,
            room_control_queue_capacity: self.room_control_queue_capacity,
            connection_outbound_queue_capacity: self.connection_outbound_queue_capacity,
            presence_debounce_interval: Duration::from_millis(self.presence_debounce_ms),
            register_timeout: Duration::from_millis(self.register_timeout_ms),
            unregister_timeout: Duration::from_millis(self.unregister_timeout_ms),
            drop_on_broadcast_overload: self.drop_on_broadcast_overload,
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            peer_timeout: Duration::from_millis(self.peer_timeout_ms),
            outbound_batch_size: self.outbound_batch_size,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let config = args.hub_config();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }
    let config = Arc::new(config);
    tracing::debug!(?config, "hub configuration");

    // Initialize dependencies in order:
    // 1. Registry
    // 2. UseCases
    // 3. Server
    let registry = Arc::new(Registry::new(config.clone()));

    let join_room_usecase = Arc::new(JoinRoomUseCase::new(registry.clone()));
    let list_rooms_usecase = Arc::new(ListRoomsUseCase::new(registry.clone()));

    let server = Server::new(join_room_usecase, list_rooms_usecase, config);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
