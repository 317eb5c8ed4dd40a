// Standalone MCP server binary (stdio, single session)

use anyhow::{Context, Result};
use solx402_clients::config::{SOLANA_MCP_URL, X402_DOCS_MCP_URL};
use solx402_core::{resolve, RawParams};
use solx402_mcp::protocol::ServerInfo;
use solx402_mcp::{
    default_registry, CollaboratorSettings, Collaborators, SessionServerFactory, StdioServer,
};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries protocol frames
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::info!("Solx402 MCP server starting (stdio)...");

    // One configuration for the whole process, validated like a request's
    let config = resolve(&RawParams::from_env(std::env::vars()))
        .into_config()
        .context("invalid configuration in environment")?;

    let settings = CollaboratorSettings {
        x402_docs_url: Url::parse(X402_DOCS_MCP_URL)?,
        solana_mcp_url: Url::parse(SOLANA_MCP_URL)?,
        request_timeout: Duration::from_secs(30),
    };
    let collaborators = Collaborators::connect(&settings)?;
    let registry = default_registry(&collaborators)?;

    tracing::info!(
        base = registry.base_len(),
        extended = registry.extended_len(),
        "Registered tools"
    );

    let factory = SessionServerFactory::new(Arc::new(registry), ServerInfo::default());
    let session = Arc::new(factory.create(config)?);

    StdioServer::new(session).run().await
}
