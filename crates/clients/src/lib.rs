//! # Solx402 clients
//!
//! Outbound collaborators used by the Solx402 MCP tools:
//!
//! - [`facilitator::FacilitatorClient`] lists a facilitator's catalog of
//!   payable services.
//! - [`remote_mcp::RemoteMcpClient`] proxies tool calls to remote MCP
//!   endpoints over Streamable HTTP.
//! - [`solana_rpc::SolanaRpcClient`] reads token balances.
//! - [`payment::PayingClient`] consumes x402 payment-gated services.
//!
//! All of them share one [`transport::HttpTransport`], built once per
//! process from a [`config::ClientConfig`].

pub mod config;
pub mod error;
pub mod facilitator;
pub mod payment;
pub mod remote_mcp;
pub mod solana_rpc;
pub mod transport;

pub use config::{ClientConfig, RemoteEndpoint, RetryConfig};
pub use error::{ClientError, ClientResult};
pub use facilitator::FacilitatorClient;
pub use payment::PayingClient;
pub use remote_mcp::RemoteMcpClient;
pub use solana_rpc::SolanaRpcClient;
pub use transport::HttpTransport;
