use crate::transport::{LifecycleHook, LoggingHook};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solx402_clients::config::{SOLANA_MCP_URL, X402_DOCS_MCP_URL};
use solx402_mcp::protocol::ServerInfo;
use solx402_mcp::{default_registry, CollaboratorSettings, Collaborators, SessionServerFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub clients: ClientsConfig,

    #[serde(default)]
    pub transport: TransportConfig,
}

/// Identity reported to MCP clients in `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_server_name")]
    pub name: String,

    #[serde(default = "default_server_version")]
    pub version: String,
}

fn default_server_name() -> String {
    ServerInfo::default().name
}

fn default_server_version() -> String {
    ServerInfo::default().version
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsConfig {
    #[serde(default = "default_x402_docs_url")]
    pub x402_docs_url: String,

    #[serde(default = "default_solana_mcp_url")]
    pub solana_mcp_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_x402_docs_url() -> String {
    X402_DOCS_MCP_URL.to_string()
}

fn default_solana_mcp_url() -> String {
    SOLANA_MCP_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            x402_docs_url: default_x402_docs_url(),
            solana_mcp_url: default_solana_mcp_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// DNS-rebinding protection. An empty list accepts any value for that header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub allowed_hosts: Vec<String>,

    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let Some(path) = config_path else {
            return Ok(Self::default());
        };

        // Load config file if it exists, otherwise use defaults
        if path.exists() {
            let content =
                std::fs::read_to_string(path).context("Failed to read configuration file")?;
            toml::from_str(&content).context("Failed to parse configuration file")
        } else {
            tracing::info!("Configuration file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn collaborator_settings(&self) -> Result<CollaboratorSettings> {
        Ok(CollaboratorSettings {
            x402_docs_url: Url::parse(&self.clients.x402_docs_url)
                .context("clients.x402_docs_url is not a valid URL")?,
            solana_mcp_url: Url::parse(&self.clients.solana_mcp_url)
                .context("clients.solana_mcp_url is not a valid URL")?,
            request_timeout: Duration::from_secs(self.clients.request_timeout_secs),
        })
    }

    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.server.name.clone(),
            version: self.server.version.clone(),
        }
    }
}

/// Application state shared across handlers. Everything here is read-only
/// after startup; per-request sessions are built from it.
#[derive(Clone)]
pub struct AppState {
    pub factory: SessionServerFactory,
    pub transport: TransportConfig,
    pub hook: Arc<dyn LifecycleHook>,
    /// `$id` of the configuration discovery document
    pub schema_id: String,
}

impl AppState {
    pub fn new(config: &ServerConfig, host: &str, port: u16) -> Result<Self> {
        let collaborators = Collaborators::connect(&config.collaborator_settings()?)
            .context("Failed to build outbound clients")?;
        let registry = default_registry(&collaborators).context("Failed to register tools")?;

        tracing::info!(
            base = registry.base_len(),
            extended = registry.extended_len(),
            "Registered tools"
        );

        Ok(Self {
            factory: SessionServerFactory::new(Arc::new(registry), config.server_info()),
            transport: config.transport.clone(),
            hook: Arc::new(LoggingHook),
            schema_id: format!("http://{}:{}/.well-known/mcp-config", host, port),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [clients]
            request_timeout_secs = 5

            [transport]
            allowed_hosts = ["localhost:3000"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.name, "solx402-mcp-server");
        assert_eq!(config.clients.x402_docs_url, X402_DOCS_MCP_URL);
        assert_eq!(config.clients.request_timeout_secs, 5);
        assert_eq!(config.transport.allowed_hosts, vec!["localhost:3000"]);
        assert!(config.transport.allowed_origins.is_empty());
    }

    #[test]
    fn test_load_without_file() {
        let config = ServerConfig::load(None).unwrap();
        assert_eq!(config.clients.request_timeout_secs, 30);

        let missing = ServerConfig::load(Some(Path::new("/nonexistent/solx402.toml"))).unwrap();
        assert_eq!(missing.server.version, "1.0.0");
    }

    #[test]
    fn test_invalid_client_url_is_reported() {
        let mut config = ServerConfig::default();
        config.clients.solana_mcp_url = "not a url".to_string();
        let err = config.collaborator_settings().unwrap_err();
        assert!(err.to_string().contains("solana_mcp_url"));
    }

    #[test]
    fn test_app_state_schema_id() {
        let state = AppState::new(&ServerConfig::default(), "127.0.0.1", 3000).unwrap();
        assert_eq!(state.schema_id, "http://127.0.0.1:3000/.well-known/mcp-config");
        assert_eq!(state.factory.info().name, "solx402-mcp-server");
    }
}
