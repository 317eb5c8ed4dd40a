//! Streamable HTTP transport for one request.
//!
//! A [`StreamableHttpTransport`] is created per request, bound to the
//! session server built for that request, and closed exactly once: when
//! its response stream ends, when the handler returns early, or when the
//! client disconnects and axum drops the response body.

use crate::config::TransportConfig;
use axum::{
    body::Bytes,
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde_json::Value;
use solx402_mcp::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use solx402_mcp::SessionServer;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Observes session open/close. Installed once per process.
pub trait LifecycleHook: Send + Sync {
    fn on_open(&self, _session: Uuid) {}

    fn on_close(&self, session: Uuid);
}

pub struct LoggingHook;

impl LifecycleHook for LoggingHook {
    fn on_open(&self, session: Uuid) {
        debug!(session = %session, "Transport connected");
    }

    fn on_close(&self, session: Uuid) {
        info!(session = %session, "Request closed");
    }
}

/// Reasons a request is refused before it reaches the session server.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid Host header: {0}")]
    InvalidHost(String),

    #[error("Invalid Origin header: {0}")]
    InvalidOrigin(String),

    #[error("Not Acceptable: Client must accept {0}")]
    NotAcceptable(&'static str),

    #[error("Unsupported Media Type: Content-Type must be application/json")]
    UnsupportedMediaType,

    #[error("Parse error: Invalid JSON")]
    Parse,

    #[error("Invalid Request: {0}")]
    InvalidRequest(&'static str),
}

impl TransportError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidHost(_) | Self::InvalidOrigin(_) => StatusCode::FORBIDDEN,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Parse | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> i32 {
        match self {
            Self::Parse => JsonRpcError::PARSE_ERROR,
            Self::InvalidRequest(_) => JsonRpcError::INVALID_REQUEST,
            _ => JsonRpcError::SERVER_ERROR,
        }
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        let envelope = JsonRpcResponse::error(
            Value::Null,
            JsonRpcError::custom(self.code(), self.to_string()),
        );
        (self.status(), Json(envelope)).into_response()
    }
}

/// One request's transport, owning the request's session server.
pub struct StreamableHttpTransport {
    session: Arc<SessionServer>,
    hook: Arc<dyn LifecycleHook>,
    options: TransportConfig,
    closed: AtomicBool,
}

impl StreamableHttpTransport {
    /// Attach a freshly built session server. No session identifier is
    /// issued; the transport lives only as long as this request.
    pub fn connect(
        session: SessionServer,
        options: TransportConfig,
        hook: Arc<dyn LifecycleHook>,
    ) -> Arc<Self> {
        hook.on_open(session.id());
        Arc::new(Self {
            session: Arc::new(session),
            hook,
            options,
            closed: AtomicBool::new(false),
        })
    }

    /// Close the transport and its session server. Only the first call
    /// has an effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.session.close();
        self.hook.on_close(self.session.id());
    }

    /// Serve a POST body: a single JSON-RPC message or a batch.
    ///
    /// Bodies carrying only notifications or client responses get `202`.
    /// Otherwise each request is dispatched on its own task and responses
    /// are streamed back as server-sent events in completion order.
    pub async fn handle_post(self: Arc<Self>, headers: &HeaderMap, body: Bytes) -> Response {
        if let Err(e) = self.validate_post(headers) {
            warn!(session = %self.session.id(), error = %e, "Rejected MCP request");
            return e.into_response();
        }

        let messages = match parse_messages(&body) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(session = %self.session.id(), error = %e, "Rejected MCP request body");
                return e.into_response();
            }
        };

        let mut requests = Vec::new();
        let mut rejected = Vec::new();
        for message in messages {
            match classify(message) {
                Inbound::Request(request) if request.is_notification() => {
                    self.session.handle(request).await;
                }
                Inbound::Request(request) => requests.push(request),
                Inbound::Invalid(id) => {
                    rejected.push(JsonRpcResponse::error(id, JsonRpcError::invalid_request()))
                }
                Inbound::Response => {}
            }
        }

        if requests.is_empty() && rejected.is_empty() {
            self.close();
            return StatusCode::ACCEPTED.into_response();
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        for response in rejected {
            let _ = tx.send(response);
        }
        for request in requests {
            let session = self.session.clone();
            let tx = tx.clone();
            // Results arriving after the client went away are dropped with
            // the receiver; the tool call itself runs to completion.
            tokio::spawn(async move {
                if let Some(response) = session.handle(request).await {
                    let _ = tx.send(response);
                }
            });
        }
        drop(tx);

        let transport = self;
        let stream = async_stream::stream! {
            while let Some(response) = rx.recv().await {
                match Event::default().event("message").json_data(&response) {
                    Ok(event) => yield Ok::<Event, Infallible>(event),
                    Err(e) => warn!(error = %e, "Failed to encode response event"),
                }
            }
            transport.close();
        };

        Sse::new(stream).into_response()
    }

    /// Open a standalone event stream. Nothing is pushed on it; it stays
    /// open until the client disconnects.
    pub fn handle_get(self: Arc<Self>, headers: &HeaderMap) -> Response {
        if let Err(e) = self
            .validate_origin(headers)
            .and_then(|()| require_accept(headers, &["text/event-stream"]))
        {
            warn!(session = %self.session.id(), error = %e, "Rejected MCP stream");
            return e.into_response();
        }

        let transport = self;
        let stream = async_stream::stream! {
            let _transport = transport;
            std::future::pending::<()>().await;
            yield Ok::<Event, Infallible>(Event::default());
        };

        Sse::new(stream)
            .keep_alive(KeepAlive::default())
            .into_response()
    }

    fn validate_post(&self, headers: &HeaderMap) -> Result<(), TransportError> {
        self.validate_origin(headers)?;
        require_accept(headers, &["application/json", "text/event-stream"])?;

        let content_type = header_str(headers, header::CONTENT_TYPE).unwrap_or_default();
        if !content_type.starts_with("application/json") {
            return Err(TransportError::UnsupportedMediaType);
        }
        Ok(())
    }

    fn validate_origin(&self, headers: &HeaderMap) -> Result<(), TransportError> {
        if !self.options.allowed_hosts.is_empty() {
            let host = header_str(headers, header::HOST).unwrap_or_default();
            if !self.options.allowed_hosts.iter().any(|h| h == host) {
                return Err(TransportError::InvalidHost(host.to_string()));
            }
        }

        if !self.options.allowed_origins.is_empty() {
            if let Some(origin) = header_str(headers, header::ORIGIN) {
                if !self.options.allowed_origins.iter().any(|o| o == origin) {
                    return Err(TransportError::InvalidOrigin(origin.to_string()));
                }
            }
        }
        Ok(())
    }
}

impl Drop for StreamableHttpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

enum Inbound {
    Request(JsonRpcRequest),
    /// A response from the client to a server-initiated request
    Response,
    /// Malformed message; carries its id when one was present
    Invalid(Value),
}

fn classify(message: Value) -> Inbound {
    if message.get("method").is_none()
        && (message.get("result").is_some() || message.get("error").is_some())
    {
        return Inbound::Response;
    }

    let id = message.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<JsonRpcRequest>(message) {
        Ok(request) => Inbound::Request(request),
        Err(_) => Inbound::Invalid(id),
    }
}

fn parse_messages(body: &[u8]) -> Result<Vec<Value>, TransportError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| TransportError::Parse)?;
    match value {
        Value::Array(messages) if messages.is_empty() => {
            Err(TransportError::InvalidRequest("empty batch"))
        }
        Value::Array(messages) => Ok(messages),
        Value::Object(_) => Ok(vec![value]),
        _ => Err(TransportError::InvalidRequest("expected an object or a batch")),
    }
}

fn require_accept(headers: &HeaderMap, required: &[&'static str]) -> Result<(), TransportError> {
    let accept = header_str(headers, header::ACCEPT).unwrap_or_default();
    match required.iter().find(|media| !accept.contains(*media)) {
        None => Ok(()),
        Some(_) if required.len() > 1 => Err(TransportError::NotAcceptable(
            "both application/json and text/event-stream",
        )),
        Some(media) => Err(TransportError::NotAcceptable(*media)),
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
