// Consume payment-gated x402 services

use super::parse_args;
use crate::normalize::RawToolResult;
use crate::protocol::ToolSchema;
use crate::tools::{json_schema_object, json_schema_string, Tool};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use solx402_clients::payment::PaymentPolicy;
use solx402_clients::{ClientError, PayingClient};
use solx402_core::wallet::KeypairSigner;
use solx402_core::{SessionConfig, WalletError};
use std::time::Instant;
use tracing::{error, info};
use url::Url;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsumeArgs {
    x402_service_url: String,
}

/// Calls an x402 service, paying for it with the session wallet when the
/// service answers 402.
pub struct ConsumeServiceTool {
    client: PayingClient,
}

impl ConsumeServiceTool {
    pub fn new(client: PayingClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for ConsumeServiceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "consume_x402_service".to_string(),
            title: Some("Consume X402 Service".to_string()),
            description: "Consume a specific X402 service.".to_string(),
            input_schema: json_schema_object(
                json!({
                    "x402ServiceUrl": json_schema_string("The URL of the X402 service to consume")
                }),
                vec!["x402ServiceUrl"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, config: &SessionConfig) -> Result<RawToolResult> {
        let args: ConsumeArgs = parse_args("consume_x402_service", arguments)?;
        let started = Instant::now();

        let outcome = async {
            let url = Url::parse(&args.x402_service_url)?;
            let signer = KeypairSigner::from_session_key(config.private_key.as_ref())?;
            let policy = PaymentPolicy {
                network: config.network,
                max_price: config.max_price,
            };
            Ok::<_, anyhow::Error>(self.client.get(&url, &signer, policy).await?)
        }
        .await;
        let duration = format!("{}ms", started.elapsed().as_millis());

        match outcome {
            Ok(response) => {
                info!(url = %args.x402_service_url, status = response.status, %duration, "Consumed x402 service");
                Ok(RawToolResult::pretty_json(&json!({
                    "success": true,
                    "url": args.x402_service_url,
                    "status": response.status,
                    "duration": duration,
                    "data": response.data,
                    "paymentResponse": response.payment_response,
                    "timestamp": timestamp(),
                })))
            }
            Err(e) => {
                error!(url = %args.x402_service_url, %duration, error = %e, "X402 service consumption failed");
                let mut result = RawToolResult::pretty_json(&json!({
                    "success": false,
                    "url": args.x402_service_url,
                    "duration": duration,
                    "error": "Failed to consume x402 service",
                    "timestamp": timestamp(),
                    "details": failure_details(&e),
                }));
                result.is_error = true;
                Ok(result)
            }
        }
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Separate HTTP-level failures (status, timeout, unreachable host) from
/// everything else.
fn failure_details(err: &anyhow::Error) -> Value {
    match err.downcast_ref::<ClientError>() {
        Some(client @ ClientError::Api { message, .. }) => json!({
            "status": client.status(),
            "statusText": client.status_text(),
            "data": serde_json::from_str::<Value>(message).unwrap_or_else(|_| json!(message)),
            "timeout": false,
            "network": false,
        }),
        Some(client @ (ClientError::Timeout | ClientError::Http(_))) => json!({
            "timeout": client.is_timeout(),
            "network": client.is_network(),
            "message": client.to_string(),
        }),
        Some(client) => json!({
            "message": client.to_string(),
            "type": error_type(client),
        }),
        None => json!({
            "message": err.to_string(),
            "type": if err.is::<WalletError>() { "WalletError" } else { "Error" },
        }),
    }
}

fn error_type(err: &ClientError) -> &'static str {
    match err {
        ClientError::Payment(_) => "PaymentError",
        ClientError::Wallet(_) => "WalletError",
        ClientError::Json(_) => "ParseError",
        _ => "ClientError",
    }
}
