//! Configuration types for outbound clients.

use std::time::Duration;
use url::Url;

/// User agent sent with every outbound request.
pub const USER_AGENT: &str = "solx402-mcp-server/1.0.0";

/// x402 documentation MCP endpoint.
pub const X402_DOCS_MCP_URL: &str = "https://x402.gitbook.io/x402/~gitbook/mcp";

/// Solana developer MCP endpoint.
pub const SOLANA_MCP_URL: &str = "https://mcp.solana.com/mcp";

/// Configuration shared by every outbound HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// User agent header value.
    pub user_agent: String,
    /// Retry configuration for idempotent requests.
    pub retry_config: RetryConfig,
}

impl ClientConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.to_string(),
            retry_config: RetryConfig::default(),
        }
    }
}

/// Identity and location of a remote MCP endpoint this server proxies to.
#[derive(Debug, Clone)]
pub struct RemoteEndpoint {
    /// Client name announced during `initialize`.
    pub client_name: String,
    pub client_version: String,
    pub url: Url,
}

impl RemoteEndpoint {
    pub fn new(client_name: impl Into<String>, url: Url) -> Self {
        Self {
            client_name: client_name.into(),
            client_version: "1.0.0".to_string(),
            url,
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries.
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// HTTP status codes to retry on.
    pub retry_on_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            retry_on_status_codes: vec![429, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Create a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Backoff doubles per attempt, capped at `max_backoff`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        std::cmp::min(self.initial_backoff.saturating_mul(factor), self.max_backoff)
    }

    /// Check if a status code should trigger a retry.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status_codes.contains(&status)
    }
}
