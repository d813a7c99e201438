//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use crate::{ApiRequest, ApiResponse, Body, Credentials, Method, Transport, TransportError};

/// A `reqwest`-backed [`Transport`] bound to one API base URL.
///
/// Holds two clients. The credentialed one keeps a cookie jar, so the
/// HTTP-only refresh cookie set by `/auth/login` is replayed on
/// `/auth/refresh` and `/auth/logout`. The plain one never stores or
/// sends cookies. The jar is private to this value: nothing in the crate
/// can read the refresh credential back out.
pub struct HttpTransport {
    base_url: String,
    credentialed: reqwest::Client,
    plain: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport for `base_url` (e.g. `http://localhost:8000`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, None)
    }

    /// Like [`new`](Self::new), with a per-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut credentialed = reqwest::Client::builder().cookie_store(true);
        let mut plain = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            credentialed = credentialed.timeout(timeout);
            plain = plain.timeout(timeout);
        }

        let base_url = base_url.into();
        tracing::debug!(%base_url, ?timeout, "http transport configured");

        Ok(Self {
            base_url,
            credentialed: credentialed.build().map_err(map_error)?,
            plain: plain.build().map_err(map_error)?,
        })
    }

    /// Returns the base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse, TransportError> {
        let client = match request.credentials {
            Credentials::Include => &self.credentialed,
            Credentials::Omit => &self.plain,
        };

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let url = self.url(&request.path);
        let mut builder = client.request(method, &url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            Body::Empty => builder,
            Body::Form(pairs) => builder.form(pairs),
            Body::Json(value) => builder.json(value),
        };

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            credentials = ?request.credentials,
            "sending request"
        );

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        tracing::debug!(path = %request.path, status, "response received");
        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

fn map_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::Connect(e.to_string())
    }
}

/// Joins a base URL and an absolute API path with exactly one slash.
fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_normalizes_slashes() {
        assert_eq!(
            join_url("http://localhost:8000/", "/auth/login"),
            "http://localhost:8000/auth/login"
        );
        assert_eq!(
            join_url("http://localhost:8000", "auth/login"),
            "http://localhost:8000/auth/login"
        );
    }

    #[test]
    fn test_new_keeps_base_url() {
        let transport =
            HttpTransport::new("http://api.test").expect("client builds");
        assert_eq!(transport.base_url(), "http://api.test");
    }
}
