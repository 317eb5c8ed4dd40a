//! Error types for outbound clients.

use solx402_core::WalletError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Error types that can occur when calling an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Remote answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Remote JSON-RPC endpoint returned an error object.
    #[error("Remote error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Remote spoke something other than the expected protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Payment could not be negotiated.
    #[error("Payment error: {0}")]
    Payment(String),

    /// Wallet could not sign.
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Connection-level failure (DNS, refused connection).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(err) if err.is_connect())
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Http(err) => err.is_connect(),
            Self::Api { status, .. } => *status >= 502,
            _ => false,
        }
    }

    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Canonical reason phrase of an API error's status.
    pub fn status_text(&self) -> Option<&'static str> {
        reqwest::StatusCode::from_u16(self.status()?)
            .ok()?
            .canonical_reason()
    }
}
