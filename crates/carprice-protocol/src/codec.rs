//! Codec trait and implementations for serializing/deserializing payloads.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The session layer uses one for two things: decoding API response
//! bodies, and encoding the persisted session record. It doesn't care
//! HOW that happens, only that something implements [`Codec`].

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → the codec is shared by the store and the lifecycle
///   manager, which run on whatever Tokio worker picks up the task.
/// - `'static` → the codec owns everything it needs, so it can live
///   inside spawned tasks.
///
/// `DeserializeOwned` (vs plain `Deserialize`) means the result doesn't
/// borrow from the input bytes, so the response buffer can be dropped
/// right after decoding.
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
/// The API speaks JSON and browser session storage holds JSON strings,
/// so this is the only codec the client needs today.
///
/// ## Example
///
/// ```rust
/// use carprice_protocol::{Codec, JsonCodec, PersistedSession};
///
/// let codec = JsonCodec;
/// let record = PersistedSession {
///     subject: "u1".into(),
///     access_token: "tok1".into(),
/// };
///
/// let bytes = codec.encode(&record).unwrap();
/// assert_eq!(bytes, br#"{"subject":"u1","accessToken":"tok1"}"#);
///
/// let decoded: PersistedSession = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, record);
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
