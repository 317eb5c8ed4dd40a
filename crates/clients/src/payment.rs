//! HTTP client that settles x402 payment challenges.
//!
//! A GET that comes back `402 Payment Required` is answered by authorizing
//! the advertised requirements for the session network and repeating the
//! request with an `X-PAYMENT` header.

use crate::error::{ClientError, ClientResult};
use crate::transport::http::{error_from_response, HttpTransport};
use base64::Engine;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use solx402_core::wallet::{select_requirements, PaymentRequirements, PaymentSigner};
use solx402_core::Network;
use tracing::{info, warn};
use url::Url;

pub const PAYMENT_HEADER: &str = "X-PAYMENT";
pub const PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// Body of a `402 Payment Required` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentChallenge {
    #[serde(default = "default_version")]
    pub x402_version: u32,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
}

fn default_version() -> u32 {
    1
}

/// What the paying session is willing to do.
#[derive(Debug, Clone, Copy)]
pub struct PaymentPolicy {
    pub network: Network,
    /// Ceiling in atomic units; zero means unlimited
    pub max_price: u64,
}

/// Outcome of a (possibly paid) request.
#[derive(Debug, Clone)]
pub struct PaidResponse {
    pub status: u16,
    /// Body as JSON when it parses, otherwise as a string
    pub data: Value,
    /// Decoded settlement receipt, when the service sent one
    pub payment_response: Option<Value>,
}

/// Client for consuming payment-gated services.
#[derive(Debug, Clone)]
pub struct PayingClient {
    http: HttpTransport,
}

impl PayingClient {
    pub fn new(http: HttpTransport) -> Self {
        Self { http }
    }

    /// GET `url`, paying once if the service demands it.
    pub async fn get(
        &self,
        url: &Url,
        signer: &dyn PaymentSigner,
        policy: PaymentPolicy,
    ) -> ClientResult<PaidResponse> {
        let response = self.http.client().get(url.clone()).send().await?;
        if response.status() != StatusCode::PAYMENT_REQUIRED {
            return finish(response).await;
        }

        let challenge: PaymentChallenge = response.json().await?;
        let requirements = select_requirements(&challenge.accepts, policy.network)
            .ok_or_else(|| {
                ClientError::Payment(format!(
                    "service offers no payment option on {}",
                    policy.network
                ))
            })?;

        let amount = requirements.amount().ok_or_else(|| {
            ClientError::Payment(format!(
                "invalid maxAmountRequired {}",
                requirements.max_amount_required
            ))
        })?;
        if policy.max_price > 0 && amount > policy.max_price {
            return Err(ClientError::Payment(format!(
                "price {} exceeds configured maximum {}",
                amount, policy.max_price
            )));
        }

        let payment = signer.authorize(challenge.x402_version, requirements)?;
        info!(url = %url, amount, network = %policy.network, "Paying for x402 service");

        let response = self
            .http
            .client()
            .get(url.clone())
            .header(PAYMENT_HEADER, payment.to_header()?)
            .send()
            .await?;
        finish(response).await
    }
}

async fn finish(response: Response) -> ClientResult<PaidResponse> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let status = response.status().as_u16();
    let payment_response = response
        .headers()
        .get(PAYMENT_RESPONSE_HEADER)
        .map(|raw| decode_payment_response(raw.to_str().unwrap_or_default()));
    if payment_response.is_none() {
        warn!("No x-payment-response header found in response");
    }

    let text = response.text().await?;
    let data = serde_json::from_str(&text).unwrap_or(Value::String(text));

    Ok(PaidResponse {
        status,
        data,
        payment_response,
    })
}

/// Decode the base64 JSON settlement header. Undecodable headers are
/// reported alongside the raw value rather than failing the call.
pub fn decode_payment_response(raw: &str) -> Value {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(raw)
        .map_err(|e| e.to_string())
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).map_err(|e| e.to_string()));

    match decoded {
        Ok(value) => value,
        Err(decode_error) => {
            warn!(error = %decode_error, "Failed to decode payment response");
            serde_json::json!({
                "error": "Failed to decode payment response",
                "rawHeader": raw,
                "decodeError": decode_error,
            })
        }
    }
}
