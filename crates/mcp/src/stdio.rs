// Single-session MCP server over newline-delimited JSON-RPC (stdio)

use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::session::SessionServer;
use anyhow::{Context, Result};
use bytes::BytesMut;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

/// Upper bound on a single inbound frame.
const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// One inbound line, or the marker for a line that exceeded the limit.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Line(String),
    Oversized,
}

/// Line codec that reports oversized lines as frames instead of errors, so
/// the stream keeps going. The inner codec skips the rest of such a line.
struct FrameCodec(LinesCodec);

impl FrameCodec {
    fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_LENGTH))
    }

    fn frame(
        result: Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<Frame>, LinesCodecError> {
        match result {
            Ok(line) => Ok(line.map(Frame::Line)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Frame::Oversized)),
            Err(e) => Err(e),
        }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = LinesCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, LinesCodecError> {
        Self::frame(self.0.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, LinesCodecError> {
        Self::frame(self.0.decode_eof(src))
    }
}

/// Serves one session for the lifetime of the process.
pub struct StdioServer {
    session: Arc<SessionServer>,
}

impl StdioServer {
    pub fn new(session: Arc<SessionServer>) -> Self {
        Self { session }
    }

    /// Serve on the process's stdin/stdout.
    pub async fn run(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Read one message per line until EOF, answering each request on its
    /// own line. The session is closed when the input ends.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = FramedRead::new(reader, FrameCodec::new());
        info!(session = %self.session.id(), "MCP stdio server started");

        while let Some(frame) = lines.next().await {
            let response = match frame.context("failed to read from stdin")? {
                Frame::Line(line) if line.trim().is_empty() => continue,
                Frame::Line(line) => self.dispatch(&line).await,
                Frame::Oversized => {
                    warn!(limit = MAX_LINE_LENGTH, "Discarding oversized frame");
                    Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()))
                }
            };

            if let Some(response) = response {
                let encoded = serde_json::to_string(&response)?;
                writer.write_all(encoded.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await.context("failed to flush stdout")?;
            }
        }

        self.session.close();
        info!(session = %self.session.id(), "stdin closed, MCP stdio server stopped");
        Ok(())
    }

    async fn dispatch(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Discarding unparseable frame");
                return Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => {
                debug!(method = %request.method, "Handling request");
                self.session.handle(request).await
            }
            Err(_) => Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerInfo;
    use crate::session::SessionServerFactory;
    use crate::tools::{FacilitatorsTool, ToolRegistry};
    use solx402_core::SessionConfig;

    fn server() -> (StdioServer, Arc<SessionServer>) {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FacilitatorsTool));
        let factory = SessionServerFactory::new(Arc::new(registry), ServerInfo::default());
        let session = Arc::new(factory.create(SessionConfig::dummy()).unwrap());
        (StdioServer::new(session.clone()), session)
    }

    async fn run(input: &str) -> Vec<Value> {
        let (server, _) = server();
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();
        parse_output(output)
    }

    fn parse_output(output: Vec<u8>) -> Vec<Value> {
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_request_response_per_line() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18","capabilities":{}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_facilitators","arguments":{}}}"#,
            "\n"
        );
        let responses = run(input).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "solx402-mcp-server");
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"]["content"][0]["type"], "text");
    }

    #[tokio::test]
    async fn test_malformed_frames() {
        let responses = run("not json\n{\"id\":3}\n").await;
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["error"]["code"], -32600);
        assert_eq!(responses[1]["id"], 3);
    }

    #[tokio::test]
    async fn test_oversized_frame_does_not_end_session() {
        let (server, session) = server();
        let oversized = "x".repeat(MAX_LINE_LENGTH + 1);
        let input = format!(
            "{}\n{}\n",
            oversized, r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#
        );

        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();
        let responses = parse_output(output);

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["id"], 9);
        assert!(responses[1]["result"].is_object());
        assert!(session.is_closed());
    }

    #[test]
    fn test_codec_resumes_after_oversized_line() {
        let mut codec = FrameCodec::new();
        let input = format!("{}\nnext\n", "x".repeat(MAX_LINE_LENGTH + 1));
        let mut buf = BytesMut::from(input.as_str());

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Oversized));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Line("next".to_string())));
    }

    #[tokio::test]
    async fn test_eof_closes_session() {
        let (server, session) = server();
        let mut output = Vec::new();
        server.serve(&b""[..], &mut output).await.unwrap();
        assert!(session.is_closed());
    }
}
