//! # Scrawl
//!
//! Game server for a multiplayer drawing-and-guessing game.
//!
//! Players connect over WebSocket, create or join rooms by a short code,
//! and take turns drawing a secret word while everyone else guesses in the
//! chat. Each room runs as its own actor task; this crate accepts
//! connections and routes their actions to the right room.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scrawl::prelude::*;
//!
//! # async fn start() -> Result<(), ScrawlError> {
//! let config = ServerConfig::load()?;
//! let server = ScrawlServerBuilder::from_config(&config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ServerConfig, DEFAULT_CONFIG_PATH};
pub use error::ScrawlError;
pub use server::{ScrawlServer, ScrawlServerBuilder};

/// Everything needed to configure and run a server, plus the wire types
/// for writing clients and tests.
pub mod prelude {
    pub use crate::{ScrawlError, ScrawlServer, ScrawlServerBuilder, ServerConfig};
    pub use scrawl_protocol::{
        ChatMessage, ClientAction, Codec, JsonCodec, PlayerId, PlayerView, RoomCode,
        RoomSnapshot, ServerEvent,
    };
    pub use scrawl_room::{GameConfig, GamePhase, RoomError};
}
