//! Error types for the protocol layer.
//!
//! Each crate in Scrawl defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in turning frames into events
//! (or back), not in networking or game rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an event into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into an action).
    ///
    /// Common causes: malformed JSON, an unknown `event` name, missing
    /// payload fields, or wrong data types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
