// Handlers for the /mcp endpoint: one session server and transport per request

use super::{ApiError, ErrorResponse};
use crate::config::AppState;
use crate::transport::StreamableHttpTransport;
use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use solx402_core::{resolve, ConfigError, RawParams};
use solx402_mcp::protocol::{JsonRpcError, JsonRpcResponse};
use std::sync::Arc;
use tracing::{info, warn};

const INVALID_CONFIG_MESSAGE: &str =
    "Invalid or missing configuration. Please provide required configuration parameters.";

pub async fn handle_post(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match connect(&state, query.as_deref()) {
        Ok(transport) => transport.handle_post(&headers, body).await,
        Err(response) => response,
    }
}

pub async fn handle_get(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    info!("Received GET MCP request");
    match connect(&state, query.as_deref()) {
        Ok(transport) => transport.handle_get(&headers),
        Err(response) => response,
    }
}

/// Any verb other than GET and POST. Answered before configuration is
/// looked at.
pub async fn method_not_allowed(method: Method) -> Response {
    info!("Received {} MCP request", method);
    let envelope = JsonRpcResponse::error(
        Value::Null,
        JsonRpcError::custom(JsonRpcError::SERVER_ERROR, "Method not allowed."),
    );
    (StatusCode::METHOD_NOT_ALLOWED, Json(envelope)).into_response()
}

/// Resolve the request's configuration, build its session server and bind
/// a fresh transport to it.
fn connect(state: &AppState, query: Option<&str>) -> Result<Arc<StreamableHttpTransport>, Response> {
    let params = RawParams::from_query(query.unwrap_or_default()).map_err(invalid_config)?;
    let resolution = resolve(&params);
    if resolution.is_dummy() {
        info!("Serving scanner request with dummy configuration");
    }
    let config = resolution.into_config().map_err(invalid_config)?;

    let session = state
        .factory
        .create(config)
        .map_err(|e| ApiError::from(e).into_response())?;

    Ok(StreamableHttpTransport::connect(
        session,
        state.transport.clone(),
        state.hook.clone(),
    ))
}

fn invalid_config(err: ConfigError) -> Response {
    warn!(error = %err, "Rejected request configuration");
    let details = json!(err.issues());
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::with_details(INVALID_CONFIG_MESSAGE, details)),
    )
        .into_response()
}
