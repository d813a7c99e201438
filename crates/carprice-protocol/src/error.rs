//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A
//! `ProtocolError` means the bytes were wrong: a response or a persisted
//! record that could not be decoded, or decoded into something that
//! breaks the contract (an empty token, say).

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: a non-JSON error page from a proxy, missing
    /// required fields, or a truncated body.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload decoded but violates the contract, e.g. a login
    /// response whose `access_token` is empty.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_payload_names_the_problem() {
        let err = ProtocolError::InvalidPayload("login response missing subject or token".into());
        assert_eq!(
            err.to_string(),
            "invalid payload: login response missing subject or token"
        );
    }
}
