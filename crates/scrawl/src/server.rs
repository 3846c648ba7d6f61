//! `ScrawlServer` builder and accept loop.
//!
//! This is the entry point for running a Scrawl server. It ties together
//! all the layers: transport → protocol → rooms.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use scrawl_protocol::{Codec, JsonCodec};
use scrawl_room::{GameConfig, RoomRegistry};
use scrawl_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ScrawlError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: RoomRegistry,
    pub(crate) codec: C,
    pub(crate) ping_interval: Duration,
    pub(crate) ping_timeout: Duration,
}

/// Builder for configuring and starting a Scrawl server.
///
/// # Example
///
/// ```rust,no_run
/// use scrawl::prelude::*;
///
/// # async fn start() -> Result<(), ScrawlError> {
/// let server = ScrawlServer::builder()
///     .bind("0.0.0.0:3001")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ScrawlServerBuilder {
    bind_addr: String,
    game: GameConfig,
    ping_interval: Duration,
    ping_timeout: Duration,
}

impl ScrawlServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(&ServerConfig::default())
    }

    /// Creates a builder from a loaded config file.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.listen_addr.clone(),
            game: config.game.clone(),
            ping_interval: config.ping_interval(),
            ping_timeout: config.ping_timeout(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the settings every new room gets.
    pub fn game_config(mut self, game: GameConfig) -> Self {
        self.game = game;
        self
    }

    /// Sets how often connections are pinged, and how long one may go
    /// without sending anything (pongs included) before it is closed.
    pub fn heartbeat(mut self, interval: Duration, timeout: Duration) -> Self {
        self.ping_interval = interval;
        self.ping_timeout = timeout;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<ScrawlServer<JsonCodec>, ScrawlError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: RoomRegistry::new(self.game.validated()),
            codec: JsonCodec,
            // tokio's interval panics on a zero period.
            ping_interval: self.ping_interval.max(Duration::from_millis(1)),
            ping_timeout: self.ping_timeout,
        });

        Ok(ScrawlServer { transport, state })
    }
}

impl Default for ScrawlServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Scrawl server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ScrawlServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl ScrawlServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ScrawlServerBuilder {
        ScrawlServerBuilder::new()
    }
}

impl<C: Codec> ScrawlServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ScrawlError> {
        Ok(self.transport.local_addr()?)
    }

    /// Number of rooms currently open.
    pub async fn room_count(&self) -> usize {
        self.state.rooms.room_count().await
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ScrawlError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then closes every
    /// room.
    ///
    /// Each accepted connection gets its own handler task.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), ScrawlError> {
        tracing::info!(addr = %self.local_addr()?, "Scrawl server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!("Scrawl server shutting down");
        self.state.rooms.shutdown_all().await;
        Ok(())
    }
}
