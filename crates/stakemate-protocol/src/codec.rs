//! Codec trait and implementations for serializing/deserializing frames.
//!
//! A "codec" converts between Rust types and wire text. The rest of the
//! server doesn't care HOW frames are serialized, only that something
//! implements [`Codec`]. Browsers speak JSON over WebSocket text frames, so
//! [`JsonCodec`] is the one we ship.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to text and decode text back.
///
/// `Send + Sync + 'static` because a single codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the text is malformed or doesn't
    /// match the expected shape.
    fn decode<T: DeserializeOwned>(
        &self,
        text: &str,
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ## Example
///
/// ```rust
/// use stakemate_protocol::{ClientFrame, ClientRequest, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let text = r#"{"id":1,"request":{"type":"create_room","display_name":"Ann"}}"#;
///
/// let frame: ClientFrame<serde_json::Value> = codec.decode(text).unwrap();
/// assert_eq!(frame.id, 1);
/// assert!(matches!(frame.request, ClientRequest::CreateRoom { .. }));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        text: &str,
    ) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
