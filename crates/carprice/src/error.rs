//! Unified error type for the client.

use carprice_protocol::ProtocolError;
use carprice_session::AuthError;
use carprice_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `carprice` facade, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CarPriceError {
    /// No usable HTTP response (connect, timeout, unreadable body).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level failure (bad credentials, expired, rejected).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CarPriceError {
    /// Text safe to display to the end user. Server internals and
    /// low-level causes stay in the `Display` output, which is for logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(e) => e.user_message(),
            Self::Transport(_) => "Could not connect to the server.".into(),
            Self::Protocol(_) => "The server sent an unexpected response.".into(),
            Self::Config(_) => "The client is misconfigured.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Connect("refused".into());
        let carprice_err: CarPriceError = err.into();
        assert!(matches!(carprice_err, CarPriceError::Transport(_)));
        assert!(carprice_err.to_string().contains("refused"));
        assert_eq!(carprice_err.user_message(), "Could not connect to the server.");
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidPayload("empty token".into());
        let carprice_err: CarPriceError = err.into();
        assert!(matches!(carprice_err, CarPriceError::Protocol(_)));
    }

    #[test]
    fn test_from_auth_error_keeps_user_message() {
        let err = AuthError::InvalidCredentials {
            message: Some("Incorrect email or password".into()),
        };
        let carprice_err: CarPriceError = err.into();
        assert!(matches!(carprice_err, CarPriceError::Auth(_)));
        assert_eq!(carprice_err.user_message(), "Incorrect email or password");
    }
}
