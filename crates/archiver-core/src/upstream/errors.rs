use thiserror::Error;

/// Errors that can occur when talking to the remote block archive.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Request exceeded the configured timeout duration.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the archive.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP-level error occurred (non-2xx status code).
    ///
    /// First field is the HTTP status code, second is the error message.
    #[error("HTTP error: {0}")]
    HttpError(u16, String),

    /// JSON-RPC error returned by the archive.
    ///
    /// First field is the RPC error code, second is the error message.
    #[error("RPC error: {0}")]
    RpcError(i32, String),

    /// Network-level error from the underlying HTTP client.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response could not be parsed or was malformed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The bundle name did not have the `<prefix>_s<start>_e<end>` shape.
    #[error("Malformed bundle name: {0}")]
    MalformedBundleName(String),

    /// Maximum concurrent requests limit has been reached.
    #[error("Concurrency limit reached: {0}")]
    ConcurrencyLimit(String),
}

impl UpstreamError {
    /// Returns a static label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailed(_) => "connection_failed",
            Self::HttpError(_, _) => "http_error",
            Self::RpcError(_, _) => "rpc_error",
            Self::Network(_) => "network",
            Self::InvalidResponse(_) => "invalid_response",
            Self::MalformedBundleName(_) => "malformed_bundle_name",
            Self::ConcurrencyLimit(_) => "concurrency_limit",
        }
    }
}
