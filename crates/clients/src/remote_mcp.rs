//! Minimal Streamable HTTP MCP client used to proxy tool calls to remote
//! MCP endpoints (documentation search, Solana expert).
//!
//! Each call runs a fresh `initialize` handshake; nothing is kept between
//! calls, matching the stateless sessions this server itself offers.

use crate::config::RemoteEndpoint;
use crate::error::{ClientError, ClientResult};
use crate::transport::http::{error_from_response, HttpTransport};
use reqwest::header;
use serde_json::{json, Value};
use tracing::debug;

const PROTOCOL_VERSION: &str = "2025-06-18";
const SESSION_HEADER: &str = "mcp-session-id";
const PROTOCOL_HEADER: &str = "mcp-protocol-version";
const ACCEPT: &str = "application/json, text/event-stream";

/// Client bound to one remote MCP endpoint.
#[derive(Debug, Clone)]
pub struct RemoteMcpClient {
    http: HttpTransport,
    endpoint: RemoteEndpoint,
}

impl RemoteMcpClient {
    pub fn new(http: HttpTransport, endpoint: RemoteEndpoint) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }

    /// Call a tool on the remote endpoint and return its raw result object.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ClientResult<Value> {
        let mut session = Session::default();

        let init = self
            .request(
                &mut session,
                1,
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": self.endpoint.client_name,
                        "version": self.endpoint.client_version,
                    }
                }),
            )
            .await?;
        if let Some(version) = init.get("protocolVersion").and_then(Value::as_str) {
            session.protocol_version = Some(version.to_string());
        }

        self.notify(&session, "notifications/initialized").await?;

        debug!(endpoint = %self.endpoint.url, tool = name, "Calling remote tool");
        let result = self
            .request(
                &mut session,
                2,
                "tools/call",
                json!({ "name": name, "arguments": arguments }),
            )
            .await;

        self.terminate(&session).await;
        result
    }

    async fn request(
        &self,
        session: &mut Session,
        id: u64,
        method: &str,
        params: Value,
    ) -> ClientResult<Value> {
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        let response = session
            .apply(self.http.client().post(self.endpoint.url.clone()))
            .header(header::ACCEPT, ACCEPT)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        if let Some(id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            session.id = Some(id.to_string());
        }

        let is_stream = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let message = if is_stream {
            let text = response.text().await?;
            find_sse_response(&text, id)?
        } else {
            response.json::<Value>().await?
        };

        into_result(message)
    }

    async fn notify(&self, session: &Session, method: &str) -> ClientResult<()> {
        let body = json!({ "jsonrpc": "2.0", "method": method });
        let response = session
            .apply(self.http.client().post(self.endpoint.url.clone()))
            .header(header::ACCEPT, ACCEPT)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    /// Best-effort session termination; remotes may refuse with 405.
    async fn terminate(&self, session: &Session) {
        if session.id.is_none() {
            return;
        }
        let request = session.apply(self.http.client().delete(self.endpoint.url.clone()));
        if let Err(e) = request.send().await {
            debug!(error = %e, "Remote session termination failed");
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    id: Option<String>,
    protocol_version: Option<String>,
}

impl Session {
    fn apply(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(id) = &self.id {
            request = request.header(SESSION_HEADER, id);
        }
        if let Some(version) = &self.protocol_version {
            request = request.header(PROTOCOL_HEADER, version);
        }
        request
    }
}

/// Scan SSE `data:` payloads for the JSON-RPC response with the given id.
fn find_sse_response(stream: &str, id: u64) -> ClientResult<Value> {
    let mut data = String::new();

    // A blank line terminates an event; flush the accumulated data then.
    for line in stream.lines().chain(std::iter::once("")) {
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        } else if line.is_empty() && !data.is_empty() {
            if let Ok(message) = serde_json::from_str::<Value>(&data) {
                if message.get("id").and_then(Value::as_u64) == Some(id) {
                    return Ok(message);
                }
            }
            data.clear();
        }
    }

    Err(ClientError::Protocol(format!(
        "no response with id {} in event stream",
        id
    )))
}

fn into_result(message: Value) -> ClientResult<Value> {
    if let Some(error) = message.get("error") {
        return Err(ClientError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(-32603),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    message
        .get("result")
        .cloned()
        .ok_or_else(|| ClientError::Protocol("response has neither result nor error".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use std::sync::Arc;
    use url::Url;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RemoteMcpClient {
        let http = HttpTransport::new(Arc::new(ClientConfig::default())).unwrap();
        let url = Url::parse(&format!("{}/mcp", server.uri())).unwrap();
        RemoteMcpClient::new(http, RemoteEndpoint::new("test-client", url))
    }

    async fn mount_handshake(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "initialize"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("mcp-session-id", "remote-1")
                    .set_body_json(json!({
                        "jsonrpc": "2.0",
                        "id": 1,
                        "result": {
                            "protocolVersion": "2025-06-18",
                            "capabilities": {},
                            "serverInfo": {"name": "remote", "version": "1"}
                        }
                    })),
            )
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "notifications/initialized"})))
            .and(header("mcp-session-id", "remote-1"))
            .respond_with(ResponseTemplate::new(202))
            .mount(server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/mcp"))
            .respond_with(ResponseTemplate::new(405))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_call_tool_json_response() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({
                "method": "tools/call",
                "params": {"name": "searchDocumentation", "arguments": {"query": "facilitator"}}
            })))
            .and(header("mcp-session-id", "remote-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "result": {"content": [{"type": "text", "text": "Facilitators verify payments"}]}
            })))
            .mount(&server)
            .await;

        let result = client(&server)
            .call_tool("searchDocumentation", json!({"query": "facilitator"}))
            .await
            .unwrap();
        assert_eq!(result["content"][0]["text"], "Facilitators verify payments");
    }

    #[tokio::test]
    async fn test_call_tool_event_stream_response() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        let stream = concat!(
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n",
            "\n",
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"content\":[{\"type\":\"text\",\"text\":\"anchor\"}]}}\n",
            "\n"
        );
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "tools/call"})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(stream, "text/event-stream"))
            .mount(&server)
            .await;

        let result = client(&server)
            .call_tool("Solana_Documentation_Search", json!({"query": "pda"}))
            .await
            .unwrap();
        assert_eq!(result["content"][0]["text"], "anchor");
    }

    #[tokio::test]
    async fn test_remote_error_object() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "tools/call"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "error": {"code": -32602, "message": "Unknown tool"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).call_tool("nope", json!({})).await.unwrap_err();
        match err {
            ClientError::Rpc { code, message } => {
                assert_eq!(code, -32602);
                assert_eq!(message, "Unknown tool");
            }
            other => panic!("Expected Rpc error, got {:?}", other),
        }
    }

    #[test]
    fn test_sse_without_matching_id() {
        let err = find_sse_response("data: {\"jsonrpc\":\"2.0\",\"id\":9,\"result\":{}}\n\n", 2)
            .unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_sse_multiline_data() {
        let stream = "data: {\"jsonrpc\":\"2.0\",\ndata: \"id\":2,\"result\":{\"ok\":true}}\n\n";
        let message = find_sse_response(stream, 2).unwrap();
        assert_eq!(message["result"]["ok"], true);
    }
}
