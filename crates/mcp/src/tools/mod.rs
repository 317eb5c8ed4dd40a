pub mod consume;
pub mod solana_expert;
pub mod wallet;
pub mod x402;
mod registry;

pub use consume::ConsumeServiceTool;
pub use registry::{
    json_schema_empty, json_schema_integer, json_schema_object, json_schema_string,
    json_schema_uri, RegistryError, Tool, ToolRegistry, ToolSet,
};
pub use solana_expert::{SolanaExpertTool, SOLANA_EXPERT_TOOLS};
pub use wallet::{PublicKeyTool, UsdcBalanceTool};
pub use x402::{FacilitatorsTool, ProtocolFlowTool, SearchDocsTool, ServicesTool};

use crate::normalize::RawToolResult;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use solx402_clients::{
    ClientConfig, ClientError, ClientResult, FacilitatorClient, HttpTransport, PayingClient,
    RemoteEndpoint, RemoteMcpClient, SolanaRpcClient,
};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Timeout for consuming paid services, which wait on settlement.
pub const PAYMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the proxied MCP endpoints live and how long ordinary calls may take.
#[derive(Debug, Clone)]
pub struct CollaboratorSettings {
    pub x402_docs_url: Url,
    pub solana_mcp_url: Url,
    pub request_timeout: Duration,
}

/// Outbound clients shared by every session. They hold connection pools
/// only; per-session parameters are passed on each call.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub facilitator: FacilitatorClient,
    pub x402_docs: RemoteMcpClient,
    pub solana_mcp: RemoteMcpClient,
    pub solana_rpc: SolanaRpcClient,
    pub paying: PayingClient,
}

impl Collaborators {
    pub fn connect(settings: &CollaboratorSettings) -> ClientResult<Self> {
        let http = HttpTransport::new(Arc::new(ClientConfig::new(settings.request_timeout)))?;
        let paying_http = HttpTransport::new(Arc::new(ClientConfig::new(PAYMENT_TIMEOUT)))?;

        Ok(Self {
            facilitator: FacilitatorClient::new(http.clone()),
            x402_docs: RemoteMcpClient::new(
                http.clone(),
                RemoteEndpoint::new("x402-docs-mcp-client", settings.x402_docs_url.clone()),
            ),
            solana_mcp: RemoteMcpClient::new(
                http.clone(),
                RemoteEndpoint::new("solana-mcp-client", settings.solana_mcp_url.clone()),
            ),
            solana_rpc: SolanaRpcClient::new(http),
            paying: PayingClient::new(paying_http),
        })
    }
}

/// The full tool catalog: the x402 tools every session gets, plus the
/// Solana expert proxies as the opt-in extension.
pub fn default_registry(collaborators: &Collaborators) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(ProtocolFlowTool));
    registry.register(Arc::new(SearchDocsTool::new(collaborators.x402_docs.clone())));
    registry.register(Arc::new(ServicesTool::new(collaborators.facilitator.clone())));
    registry.register(Arc::new(PublicKeyTool));
    registry.register(Arc::new(UsdcBalanceTool::new(collaborators.solana_rpc.clone())));
    registry.register(Arc::new(ConsumeServiceTool::new(collaborators.paying.clone())));
    registry.register(Arc::new(FacilitatorsTool));

    for spec in SOLANA_EXPERT_TOOLS {
        registry.register_extended(Arc::new(SolanaExpertTool::new(
            spec,
            collaborators.solana_mcp.clone(),
        )));
    }

    registry.validate()?;
    Ok(registry)
}

/// Deserialize tool arguments; a missing argument object counts as empty.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> anyhow::Result<T> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).with_context(|| format!("Invalid arguments for {}", tool))
}

/// Report a collaborator failure, singling out timeouts.
pub(crate) fn client_failure(label: &str, err: &ClientError) -> RawToolResult {
    let label = if err.is_timeout() { "Request timed out" } else { label };
    RawToolResult::failure(label, err)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_order() {
        let settings = CollaboratorSettings {
            x402_docs_url: Url::parse("http://127.0.0.1:9/docs").unwrap(),
            solana_mcp_url: Url::parse("http://127.0.0.1:9/solana").unwrap(),
            request_timeout: Duration::from_secs(1),
        };
        let registry = default_registry(&Collaborators::connect(&settings).unwrap()).unwrap();

        assert_eq!(
            registry.compose(false).unwrap().names(),
            vec![
                "x402_protocol_flow",
                "search_x402_documentation",
                "get_x402_services",
                "get_wallet_public_key",
                "get_wallet_usdc_balance",
                "consume_x402_service",
                "get_facilitators",
            ]
        );
        assert_eq!(
            &registry.compose(true).unwrap().names()[7..],
            &[
                "Ask_Solana_Anchor_Framework_Expert",
                "Solana_Expert__Ask_For_Help",
                "Solana_Documentation_Search",
            ]
        );
    }

    #[test]
    fn test_parse_args_accepts_null() {
        #[derive(serde::Deserialize)]
        struct Empty {}
        assert!(parse_args::<Empty>("t", Value::Null).is_ok());
        let err = parse_args::<u32>("get_x402_services", serde_json::json!({})).unwrap_err();
        assert!(err.to_string().contains("get_x402_services"));
    }
}
