// Core types for the Solx402 MCP server: session configuration, its
// resolution from request parameters, and the wallet signing capability

pub mod address;
pub mod config;
pub mod error;
pub mod resolver;
pub mod schema;
pub mod wallet;

pub use config::{Network, PrivateKey, SessionConfig};
pub use error::{ConfigError, FieldIssue, WalletError};
pub use resolver::{resolve, RawParams, Resolution};
pub use schema::config_schema;
