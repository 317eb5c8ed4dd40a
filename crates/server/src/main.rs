use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod api;
mod config;
mod transport;

use config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "solx402")]
#[command(about = "Stateless MCP server for x402 payments on Solana", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "SOLX402_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solx402=info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    tracing::info!("Starting Solx402 MCP server");

    // Load configuration
    let config = ServerConfig::load(args.config.as_deref())?;

    api::serve(&args.host, args.port, config).await?;

    Ok(())
}
