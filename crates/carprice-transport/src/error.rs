/// Errors that can occur in the transport layer.
///
/// Every variant means "no usable HTTP response arrived". A response
/// with a 4xx/5xx status is NOT a transport error. It comes back as an
/// [`ApiResponse`](crate::ApiResponse) so the session layer can inspect
/// the status (401 is the refresh trigger).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not reach the server (DNS, refused, reset).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The transport gave up waiting for a response.
    #[error("request timed out")]
    Timeout,

    /// The request could not be built (bad URL, bad header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A response started arriving but its body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}
