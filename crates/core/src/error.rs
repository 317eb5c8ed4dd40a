// Error types shared by configuration resolution and wallet handling

use serde::Serialize;

/// A single problem found while validating request configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Dotted path of the offending option (e.g. `maxPrice`)
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Configuration errors are client-caused and map to 4xx responses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// One or more options are missing or malformed.
    #[error("invalid configuration: {}", join_issues(.0))]
    Invalid(Vec<FieldIssue>),

    /// The base64 `config` parameter could not be decoded.
    #[error("malformed config parameter: {0}")]
    MalformedEncoding(String),
}

impl ConfigError {
    /// Issues in a form suitable for the `details` field of an error response.
    pub fn issues(&self) -> Vec<FieldIssue> {
        match self {
            Self::Invalid(issues) => issues.clone(),
            Self::MalformedEncoding(message) => vec![FieldIssue::new("config", message.clone())],
        }
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while turning credential material into a signer.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("no private key configured for this session")]
    MissingKey,

    #[error("private key is not valid base58: {0}")]
    Decode(#[from] bs58::decode::Error),

    #[error("private key must be 64 bytes, got {0}")]
    InvalidLength(usize),

    #[error("private key does not match its embedded public key")]
    KeyMismatch,

    #[error("invalid account address: {0}")]
    InvalidAddress(String),

    #[error("failed to serialize payment authorization: {0}")]
    Serialize(#[from] serde_json::Error),
}
