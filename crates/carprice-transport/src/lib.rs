//! Transport abstraction for the car-price API client.
//!
//! Provides the [`Transport`] trait that the session layer talks to, and
//! the plain-data [`ApiRequest`] / [`ApiResponse`] types that cross it.
//! The session layer never touches an HTTP library directly: production
//! code plugs in [`HttpTransport`], tests plug in a scripted fake.
//!
//! # Credential modes
//!
//! Browsers distinguish requests that carry cookies from ones that don't.
//! The refresh credential is an HTTP-only cookie set by the server on
//! login, so login/refresh/logout must be sent with
//! [`Credentials::Include`]. Everything else uses [`Credentials::Omit`].
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpTransport`] via `reqwest`

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::HttpTransport;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// HTTP method of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Whether browser-managed cookies accompany the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Cookies are sent and stored (credential-forwarding mode).
    Include,
    /// No cookies. The default for ordinary API calls.
    #[default]
    Omit,
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` key/value pairs, in order.
    Form(Vec<(String, String)>),
    /// `application/json`.
    Json(serde_json::Value),
}

/// An outgoing API call, relative to the transport's base URL.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Body,
    pub credentials: Credentials,
    /// Bearer token for the `Authorization` header, if any.
    pub bearer: Option<String>,
}

impl ApiRequest {
    /// Creates a request with no body, no credentials, and no bearer.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Body::Empty,
            credentials: Credentials::Omit,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Sets a form-encoded body.
    #[must_use]
    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Body::Form(
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        );
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    /// Switches the request to credential-forwarding mode.
    #[must_use]
    pub fn with_credentials(mut self) -> Self {
        self.credentials = Credentials::Include;
        self
    }

    /// Attaches `Authorization: Bearer <token>`.
    #[must_use]
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Hand-written so the bearer token and form values (passwords) never
/// end up in logs.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            Body::Empty => "empty",
            Body::Form(_) => "form",
            Body::Json(_) => "json",
        };
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body", &body)
            .field("credentials", &self.credentials)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A received HTTP response: status plus raw body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `true` for 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `true` for 401, the only status that triggers a token refresh.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// `true` for 5xx.
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Sends [`ApiRequest`]s to the remote API.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one transport is shared by every
///   in-flight operation, and those operations run as spawned Tokio
///   tasks.
/// - The returned future is `Send` for the same reason.
///
/// Implementations return `Ok` for every HTTP response regardless of
/// status, and `Err` only when no response was obtained.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_request_defaults_omit_credentials_and_bearer() {
        let req = ApiRequest::post("/auth/refresh");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.credentials, Credentials::Omit);
        assert_eq!(req.body, Body::Empty);
        assert!(req.bearer.is_none());
    }

    #[test]
    fn test_api_request_form_preserves_pair_order() {
        let req = ApiRequest::post("/auth/login")
            .form([("username", "a@b.c"), ("password", "pw")]);
        assert_eq!(
            req.body,
            Body::Form(vec![
                ("username".into(), "a@b.c".into()),
                ("password".into(), "pw".into()),
            ])
        );
    }

    #[test]
    fn test_api_request_debug_redacts_secrets() {
        let req = ApiRequest::post("/auth/login")
            .form([("password", "hunter2")])
            .bearer("tok-secret")
            .with_credentials();
        let printed = format!("{req:?}");
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("tok-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_api_response_status_classes() {
        assert!(ApiResponse::new(204, Vec::new()).is_success());
        assert!(ApiResponse::new(401, Vec::new()).is_unauthorized());
        assert!(!ApiResponse::new(403, Vec::new()).is_unauthorized());
        assert!(ApiResponse::new(503, Vec::new()).is_server_error());
        assert!(!ApiResponse::new(404, Vec::new()).is_server_error());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Post.to_string(), "POST");
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }
}
