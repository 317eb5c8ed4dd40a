// x402 protocol tools: flow diagram, documentation search, service
// discovery and the facilitator directory

use super::{client_failure, parse_args};
use crate::normalize::{RawContent, RawToolResult};
use crate::protocol::ToolSchema;
use crate::tools::{
    json_schema_empty, json_schema_integer, json_schema_object, json_schema_string,
    json_schema_uri, Tool,
};
use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use solx402_clients::facilitator::{DiscoveredService, DEFAULT_LIST_LIMIT, KNOWN_SOLANA_FACILITATORS};
use solx402_clients::{FacilitatorClient, RemoteMcpClient};
use solx402_core::{Network, SessionConfig};
use url::Url;

pub const PROTOCOL_FLOW_CAPTION: &str = "This is a x402 diagram flow:";
pub const PROTOCOL_FLOW_DIAGRAM_URL: &str = "https://raw.githubusercontent.com/leandrogavidia/solx402-mcp-server/refs/heads/main/apps/mcp-server/assets/x402-protocol-flow.avif";

/// Points the agent at the x402 flow diagram.
pub struct ProtocolFlowTool;

#[async_trait::async_trait]
impl Tool for ProtocolFlowTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "x402_protocol_flow".to_string(),
            title: Some("x402 Protocol Flow Diagram".to_string()),
            description: "Visual diagram showing the x402 protocol flow and architecture"
                .to_string(),
            input_schema: json_schema_empty(),
        }
    }

    async fn execute(&self, _arguments: Value, _config: &SessionConfig) -> Result<RawToolResult> {
        Ok(RawToolResult::new(vec![
            RawContent::text(PROTOCOL_FLOW_CAPTION),
            RawContent::text(PROTOCOL_FLOW_DIAGRAM_URL),
        ]))
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

/// Free-text search over the x402 documentation.
pub struct SearchDocsTool {
    client: RemoteMcpClient,
}

impl SearchDocsTool {
    pub fn new(client: RemoteMcpClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for SearchDocsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_x402_documentation".to_string(),
            title: Some("Search X402 Documentation".to_string()),
            description: "Search across the documentation to find relevant information, code \
                examples, API references, and guides. Use this tool when you need to answer \
                questions about x402, find specific documentation, understand how features work, \
                or locate implementation details. The search returns contextual content with \
                titles and direct links to the documentation pages."
                .to_string(),
            input_schema: json_schema_object(
                json!({ "query": json_schema_string("The search query string") }),
                vec!["query"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, _config: &SessionConfig) -> Result<RawToolResult> {
        let args: SearchArgs = parse_args("search_x402_documentation", arguments)?;

        match self
            .client
            .call_tool("searchDocumentation", json!({ "query": args.query }))
            .await
        {
            Ok(response) => Ok(RawToolResult::pretty_json(&response)),
            Err(e) => Ok(client_failure("Failed to fetch documentation", &e)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServicesArgs {
    #[serde(default)]
    facilitator_url: Option<Url>,
    #[serde(default)]
    limit: Option<u32>,
}

/// Lists payable services from a facilitator's discovery catalog.
pub struct ServicesTool {
    client: FacilitatorClient,
}

impl ServicesTool {
    pub fn new(client: FacilitatorClient) -> Self {
        Self { client }
    }
}

/// Keep services whose primary payment option is on `network` and, when a
/// ceiling is set, costs no more than it.
pub fn filter_services(
    items: Vec<DiscoveredService>,
    network: Network,
    config: &SessionConfig,
) -> Vec<DiscoveredService> {
    items
        .into_iter()
        .filter(|service| {
            let Some(payment) = service.primary_payment() else {
                return false;
            };
            if payment.network != network.x402_name() {
                return false;
            }
            config.max_price == 0
                || payment
                    .amount()
                    .is_some_and(|amount| config.within_price_ceiling(amount))
        })
        .collect()
}

#[async_trait::async_trait]
impl Tool for ServicesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_x402_services".to_string(),
            title: Some("Get X402 Services".to_string()),
            description: "Retrieve a list of available X402 services from the facilitator."
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "facilitatorUrl": json_schema_uri(
                        "The URL of the X402 facilitator to query (defaults to the session facilitator)"
                    ),
                    "limit": json_schema_integer(
                        "Maximum number of services to retrieve",
                        1,
                        u64::from(DEFAULT_LIST_LIMIT)
                    )
                }),
                vec![],
            ),
        }
    }

    async fn execute(&self, arguments: Value, config: &SessionConfig) -> Result<RawToolResult> {
        let args: ServicesArgs = parse_args("get_x402_services", arguments)?;
        let limit = args.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if limit == 0 {
            anyhow::bail!("limit must be at least 1");
        }
        let facilitator = args
            .facilitator_url
            .unwrap_or_else(|| config.facilitator_url.clone());

        let list = match self.client.list(&facilitator, limit).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(facilitator = %facilitator, error = %e, "Failed to fetch X402 services");
                return Ok(client_failure("Failed to fetch X402 services", &e));
            }
        };

        let network = config.network;
        let services = filter_services(list.items, network, config);

        Ok(RawToolResult::pretty_json(&json!({
            "totalServices": services.len(),
            "services": services,
            "x402Version": list.x402_version,
            "config": {
                "facilitatorUrl": facilitator.as_str(),
                "maxPrice": config.max_price,
                "network": network,
            }
        })))
    }
}

/// Directory of facilitators that settle Solana payments.
pub struct FacilitatorsTool;

#[async_trait::async_trait]
impl Tool for FacilitatorsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_facilitators".to_string(),
            title: Some("Get Facilitators".to_string()),
            description: "Retrieve a list of known Solana facilitators.".to_string(),
            input_schema: json_schema_empty(),
        }
    }

    async fn execute(&self, _arguments: Value, _config: &SessionConfig) -> Result<RawToolResult> {
        Ok(RawToolResult::pretty_json(&json!({
            "facilitators": KNOWN_SOLANA_FACILITATORS,
            "totalFacilitators": KNOWN_SOLANA_FACILITATORS.len(),
        })))
    }
}
