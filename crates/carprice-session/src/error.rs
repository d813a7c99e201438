//! Error types for the session layer.

use carprice_transport::ApiResponse;

/// Errors surfaced by session operations.
///
/// `Clone` is required: a single in-flight login is shared by every
/// caller that joined it, and each of them receives its own copy of the
/// outcome.
///
/// The `Display` text is for logs. For anything shown to an end user,
/// use [`user_message`](Self::user_message), which never echoes raw
/// server internals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The server rejected the login. `message` is the server's own
    /// user-facing `detail`, when it sent one.
    #[error("invalid credentials")]
    InvalidCredentials { message: Option<String> },

    /// No response was obtained (connection refused, timeout, ...).
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The refresh credential was rejected; the session has been cleared.
    #[error("session expired")]
    SessionExpired,

    /// 5xx, or a 2xx whose body didn't match the contract.
    #[error("server error (status {status})")]
    ServerError { status: u16 },

    /// A protected call was rejected with a non-auth 4xx.
    #[error("request rejected (status {status})")]
    Rejected { status: u16, message: Option<String> },

    /// A protected call was attempted with no session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Still 401 after a successful refresh. Not retried again.
    #[error("unauthorized after token refresh")]
    Unauthorized,

    /// A logout happened while this operation was in flight, so its
    /// result was discarded.
    #[error("operation superseded by logout")]
    Superseded,
}

impl AuthError {
    /// Classifies a non-2xx response to an ordinary API call: 5xx becomes
    /// [`ServerError`](Self::ServerError), anything else
    /// [`Rejected`](Self::Rejected) with the server's `detail` if any.
    pub fn from_response(response: &ApiResponse) -> Self {
        crate::manager::rejection(response, |message| Self::Rejected {
            status: response.status,
            message,
        })
    }

    /// Text safe to display to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials { message: Some(m) }
            | Self::Rejected { message: Some(m), .. } => m.clone(),
            Self::InvalidCredentials { message: None } => {
                "Invalid email or password.".into()
            }
            Self::NetworkFailure(_) => "Could not connect to the server.".into(),
            Self::SessionExpired => {
                "Your session has expired. Please log in again.".into()
            }
            Self::ServerError { .. } => {
                "The server could not process the request. Please try again later."
                    .into()
            }
            Self::Rejected { message: None, .. } => "The request was rejected.".into(),
            Self::NotAuthenticated => "Please log in to continue.".into(),
            Self::Unauthorized => {
                "You are not authorized to perform this action.".into()
            }
            Self::Superseded => "The operation was cancelled by a logout.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_forwards_server_detail() {
        let err = AuthError::InvalidCredentials {
            message: Some("Credenciales inválidas".into()),
        };
        assert_eq!(err.user_message(), "Credenciales inválidas");
    }

    #[test]
    fn test_from_response_classifies_status() {
        let server = ApiResponse::new(502, b"<html>Bad Gateway</html>".to_vec());
        assert_eq!(
            AuthError::from_response(&server),
            AuthError::ServerError { status: 502 }
        );

        let conflict = ApiResponse::new(400, br#"{"detail":"Email already registered"}"#.to_vec());
        assert_eq!(
            AuthError::from_response(&conflict),
            AuthError::Rejected {
                status: 400,
                message: Some("Email already registered".into()),
            }
        );
    }

    #[test]
    fn test_user_message_server_error_is_generic() {
        let err = AuthError::ServerError { status: 500 };
        assert!(!err.user_message().contains("500"));
    }

    #[test]
    fn test_user_message_network_failure_hides_transport_detail() {
        let err = AuthError::NetworkFailure("tcp connect error: 10.0.0.3:8000".into());
        assert_eq!(err.user_message(), "Could not connect to the server.");
        assert!(err.to_string().contains("10.0.0.3"));
    }
}
