use crate::config::{AppState, ServerConfig};
use anyhow::Result;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solx402_core::config_schema;
use solx402_mcp::protocol::{JsonRpcError, JsonRpcResponse};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};

mod mcp;

/// Start the API server
pub async fn serve(host: &str, port: u16, config: ServerConfig) -> Result<()> {
    let state = AppState::new(&config, host, port)?;

    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("MCP Stateless Streamable HTTP listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router
pub(crate) fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/mcp",
            get(mcp::handle_get)
                .head(mcp::method_not_allowed)
                .post(mcp::handle_post)
                .delete(mcp::method_not_allowed)
                .fallback(mcp::method_not_allowed),
        )
        .route("/.well-known/mcp-config", get(mcp_config))
        .route("/health", get(health_check))
        // Middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(cors())
        .with_state(Arc::new(state))
}

/// Request span without the query string, which carries session credentials.
fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
    )
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("mcp-session-id")])
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Configuration discovery document
async fn mcp_config(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(config_schema(&state.schema_id))
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    pub fn with_details(error: impl Into<String>, details: Value) -> Self {
        Self {
            error: error.into(),
            details: Some(details),
        }
    }
}

/// Failure while setting up a session. Reported as a JSON-RPC internal
/// error; the cause is logged, never sent.
pub struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Error handling MCP request");

        let envelope = JsonRpcResponse::error(
            Value::Null,
            JsonRpcError::internal_error("Internal server error"),
        );
        (StatusCode::INTERNAL_SERVER_ERROR, Json(envelope)).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
