// Proxies to the Solana developer MCP endpoint

use super::{client_failure, parse_args};
use crate::normalize::RawToolResult;
use crate::protocol::ToolSchema;
use crate::tools::{json_schema_object, json_schema_string, Tool};
use anyhow::Result;
use serde_json::{Map, Value};
use solx402_clients::RemoteMcpClient;
use solx402_core::SessionConfig;

/// Static description of one proxied tool.
#[derive(Debug, Clone, Copy)]
pub struct ExpertToolSpec {
    /// Name here and on the remote endpoint
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// The single string argument the remote tool takes
    pub argument: &'static str,
    pub argument_description: &'static str,
    pub failure: &'static str,
}

pub const SOLANA_EXPERT_TOOLS: &[ExpertToolSpec] = &[
    ExpertToolSpec {
        name: "Ask_Solana_Anchor_Framework_Expert",
        title: "Ask Solana Anchor Framework Expert",
        description: "Ask questions about developing on Solana with the Anchor Framework.",
        argument: "question",
        argument_description:
            "Any question about the Anchor Framework. (how-to, concepts, APIs, SDKs, errors)",
        failure: "Failed to fetch Solana Anchor Framework expert answer",
    },
    ExpertToolSpec {
        name: "Solana_Expert__Ask_For_Help",
        title: "Solana Expert - Ask For Help",
        description: "A Solana expert that can answer questions about Solana development.",
        argument: "question",
        argument_description: "A Solana related question. (how-to, concepts, APIs, SDKs, errors)\n \
            Provide as much context about the problem as needed, to make the expert understand \
            the problem. The expert will do a similarity search based on your question and \
            provide you the results.",
        failure: "Failed to fetch Solana expert answer",
    },
    ExpertToolSpec {
        name: "Solana_Documentation_Search",
        title: "Solana Documentation Search",
        description: "Search documentation across the Solana ecosystem to get the most up to date information.",
        argument: "query",
        argument_description:
            "A search query that will be matched against a corpus of Solana documentation using RAG",
        failure: "Failed to fetch Solana documentation search results",
    },
];

/// Forwards one string argument to the same-named remote tool.
pub struct SolanaExpertTool {
    spec: ExpertToolSpec,
    client: RemoteMcpClient,
}

impl SolanaExpertTool {
    pub fn new(spec: &ExpertToolSpec, client: RemoteMcpClient) -> Self {
        Self {
            spec: *spec,
            client,
        }
    }
}

#[async_trait::async_trait]
impl Tool for SolanaExpertTool {
    fn schema(&self) -> ToolSchema {
        let mut properties = Map::new();
        properties.insert(
            self.spec.argument.to_string(),
            json_schema_string(self.spec.argument_description),
        );

        ToolSchema {
            name: self.spec.name.to_string(),
            title: Some(self.spec.title.to_string()),
            description: self.spec.description.to_string(),
            input_schema: json_schema_object(Value::Object(properties), vec![self.spec.argument]),
        }
    }

    async fn execute(&self, arguments: Value, _config: &SessionConfig) -> Result<RawToolResult> {
        let mut args: Map<String, Value> = parse_args(self.spec.name, arguments)?;
        let value = match args.remove(self.spec.argument) {
            Some(Value::String(value)) => value,
            _ => anyhow::bail!(
                "Invalid arguments for {}: `{}` must be a string",
                self.spec.name,
                self.spec.argument
            ),
        };

        let mut forwarded = Map::new();
        forwarded.insert(self.spec.argument.to_string(), Value::String(value));

        match self
            .client
            .call_tool(self.spec.name, Value::Object(forwarded))
            .await
        {
            Ok(response) => Ok(RawToolResult::pretty_json(&response)),
            Err(e) => Ok(client_failure(self.spec.failure, &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::tools::test_support::{body, http};
    use solx402_clients::{ClientConfig, HttpTransport, RemoteEndpoint};
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_handshake(server: &MockServer) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "initialize"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": {"protocolVersion": "2025-06-18"}
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "notifications/initialized"})))
            .respond_with(ResponseTemplate::new(202))
            .mount(server)
            .await;
    }

    fn tool(index: usize, server: &MockServer, http: HttpTransport) -> SolanaExpertTool {
        let endpoint = RemoteEndpoint::new("test", Url::parse(&server.uri()).unwrap());
        SolanaExpertTool::new(&SOLANA_EXPERT_TOOLS[index], RemoteMcpClient::new(http, endpoint))
    }

    #[tokio::test]
    async fn test_forwards_question() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "tools/call",
                "params": {
                    "name": "Ask_Solana_Anchor_Framework_Expert",
                    "arguments": {"question": "What is a PDA?"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 2,
                "result": {"content": [{"type": "text", "text": "A program derived address"}]}
            })))
            .mount(&server)
            .await;

        let result = tool(0, &server, http())
            .execute(json!({"question": "What is a PDA?"}), &SessionConfig::dummy())
            .await
            .unwrap();
        assert_eq!(body(&result)["content"][0]["text"], "A program derived address");
    }

    #[tokio::test]
    async fn test_timeout_is_distinguished() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let http = HttpTransport::new(Arc::new(ClientConfig::new(Duration::from_millis(100)))).unwrap();
        let result = tool(2, &server, http)
            .execute(json!({"query": "token extensions"}), &SessionConfig::dummy())
            .await
            .unwrap();

        assert!(result.is_error);
        assert_eq!(body(&result)["error"], "Request timed out");
    }

    #[tokio::test]
    async fn test_generic_failure_label() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = tool(1, &server, http())
            .execute(json!({"question": "help"}), &SessionConfig::dummy())
            .await
            .unwrap();
        assert_eq!(body(&result)["error"], "Failed to fetch Solana expert answer");
    }

    #[tokio::test]
    async fn test_missing_argument_is_rejected() {
        let server = MockServer::start().await;
        let err = tool(2, &server, http())
            .execute(json!({"question": "wrong key"}), &SessionConfig::dummy())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("`query` must be a string"));
    }

    #[test]
    fn test_schema_requires_argument() {
        let server_url = Url::parse("http://127.0.0.1:9").unwrap();
        let client = RemoteMcpClient::new(http(), RemoteEndpoint::new("t", server_url));
        let schema = SolanaExpertTool::new(&SOLANA_EXPERT_TOOLS[2], client).schema();
        assert_eq!(schema.input_schema["required"][0], "query");
        assert_eq!(schema.input_schema["properties"]["query"]["type"], "string");
    }
}
