//! Unified error type for the Scrawl server.

use scrawl_protocol::ProtocolError;
use scrawl_room::RoomError;
use scrawl_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ScrawlError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, already started, not a member).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`ServerConfig`](crate::ServerConfig).
    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The config parsed but a value is unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrawl_protocol::{ClientAction, Codec, JsonCodec, RoomCode};

    #[test]
    fn test_from_transport_error() {
        let scrawl_err: ScrawlError = TransportError::ConnectionClosed.into();
        assert!(matches!(scrawl_err, ScrawlError::Transport(_)));
        assert_eq!(scrawl_err.to_string(), "connection closed");
    }

    #[test]
    fn test_from_protocol_error() {
        let err = JsonCodec.decode::<ClientAction>(b"not json").unwrap_err();
        let scrawl_err: ScrawlError = err.into();
        assert!(matches!(scrawl_err, ScrawlError::Protocol(_)));
    }

    #[test]
    fn test_room_error_keeps_client_text() {
        let err: ScrawlError = RoomError::RoomNotFound(RoomCode::new("ABC123")).into();
        assert!(matches!(err, ScrawlError::Room(_)));
        assert_eq!(err.to_string(), "Room not found");
    }

    #[test]
    fn test_from_toml_error() {
        let parse = toml::from_str::<toml::Value>("listen_addr = ").unwrap_err();
        let err: ScrawlError = parse.into();
        assert!(err.to_string().starts_with("failed to parse config file"));
    }
}
