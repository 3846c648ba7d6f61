//! Server configuration, loaded from `scrawl.toml`.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use scrawl_room::GameConfig;
use serde::{Deserialize, Serialize};

use crate::ScrawlError;

/// Config file read when `SCRAWL_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "scrawl.toml";

/// Top-level server configuration.
///
/// ```toml
/// listen_addr = "0.0.0.0:3001"
/// ping_interval_secs = 25
/// ping_timeout_secs = 60
///
/// [game]
/// total_rounds = 3
/// drawing_secs = 60
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// How often the server pings each connection.
    pub ping_interval_secs: u64,
    /// Connections that send nothing for this long, not even a pong, are
    /// closed. Quiet players with a healthy socket are never affected.
    pub ping_timeout_secs: u64,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3001".to_string(),
            ping_interval_secs: 25,
            ping_timeout_secs: 60,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads the config file named by `SCRAWL_CONFIG` (or `scrawl.toml`),
    /// then applies the `PORT` override and validates.
    ///
    /// A missing file means defaults; an unreadable or malformed one is an
    /// error.
    pub fn load() -> Result<Self, ScrawlError> {
        let path = std::env::var("SCRAWL_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut config = Self::load_from(&path)?;
        if let Ok(port) = std::env::var("PORT") {
            config = config.with_port(&port);
        }
        config.validated()
    }

    /// Reads one TOML file. Missing files yield the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ScrawlError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml(&content)?;
                tracing::info!(path = %path.display(), "loaded configuration");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ScrawlError> {
        Ok(toml::from_str(content)?)
    }

    /// Replaces the port of `listen_addr`. Unparseable ports are ignored.
    pub fn with_port(mut self, port: &str) -> Self {
        let Ok(port) = port.trim().parse::<u16>() else {
            tracing::warn!(port, "PORT is not a valid port number, ignoring");
            return self;
        };
        self.listen_addr = match self.listen_addr.parse::<SocketAddr>() {
            Ok(mut addr) => {
                addr.set_port(port);
                addr.to_string()
            }
            Err(_) => format!("0.0.0.0:{port}"),
        };
        self
    }

    /// Checks the config, fixing what can be fixed with a warning.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `listen_addr` is not a socket address.
    pub fn validated(mut self) -> Result<Self, ScrawlError> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ScrawlError::InvalidConfig(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            )));
        }
        if self.ping_interval_secs == 0 {
            tracing::warn!("ping_interval_secs is 0, using 25");
            self.ping_interval_secs = 25;
        }
        if self.ping_timeout_secs <= self.ping_interval_secs {
            let fixed = self.ping_interval_secs * 2;
            tracing::warn!(
                ping_timeout_secs = self.ping_timeout_secs,
                "ping_timeout_secs must exceed ping_interval_secs, using {fixed}"
            );
            self.ping_timeout_secs = fixed;
        }
        self.game = self.game.validated();
        Ok(self)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }
}
