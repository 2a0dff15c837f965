//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::HubConfig,
    usecase::{JoinRoomUseCase, ListRoomsUseCase},
};

use super::{
    handler::{get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Room broadcast server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(join_room_usecase, list_rooms_usecase, config);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// JoinRoomUseCase（ルーム参加のユースケース）
    join_room_usecase: Arc<JoinRoomUseCase>,
    /// ListRoomsUseCase（ルーム一覧取得のユースケース）
    list_rooms_usecase: Arc<ListRoomsUseCase>,
    config: Arc<HubConfig>,
}

impl Server {
    pub fn new(
        join_room_usecase: Arc<JoinRoomUseCase>,
        list_rooms_usecase: Arc<ListRoomsUseCase>,
        config: Arc<HubConfig>,
    ) -> Self {
        Self {
            join_room_usecase,
            list_rooms_usecase,
            config,
        }
    }

    pub fn router(self) -> Router {
        let app_state = Arc::new(AppState {
            join_room_usecase: self.join_room_usecase,
            list_rooms_usecase: self.list_rooms_usecase,
            config: self.config,
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the server until Ctrl+C or SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Room broadcast server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?room=<name>&author=<name>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}
