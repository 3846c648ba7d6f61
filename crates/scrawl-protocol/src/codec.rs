//! Codec trait and implementations for serializing/deserializing events.
//!
//! The gateway doesn't care HOW events are serialized; it just needs
//! something that implements the [`Codec`] trait. Browser clients speak
//! JSON, so [`JsonCodec`] is the only implementation today.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task through the server state.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use scrawl_protocol::{ClientAction, Codec, JsonCodec, RoomCode};
///
/// let codec = JsonCodec;
/// let frame = br#"{"event":"start-game","data":{"roomId":"a1b2c3"}}"#;
///
/// let action: ClientAction = codec.decode(frame).unwrap();
/// assert_eq!(
///     action,
///     ClientAction::StartGame { room_id: RoomCode::new("A1B2C3") }
/// );
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{PlayerId, ServerEvent};

    #[test]
    fn test_encode_produces_event_frame() {
        let bytes = JsonCodec
            .encode(&ServerEvent::HostChanged { new_host_id: PlayerId(4) })
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, r#"{"event":"host-changed","data":{"newHostId":4}}"#);
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let result: Result<crate::ClientAction, _> =
            JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
