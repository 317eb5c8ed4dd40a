//! x402 facilitator discovery ("bazaar") client.

use crate::error::ClientResult;
use crate::transport::http::{join_segments, HttpTransport};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Default number of catalog entries requested.
pub const DEFAULT_LIST_LIMIT: u32 = 500;

/// One payment option advertised by a discovered resource.
///
/// Only the fields used for filtering are typed; everything else is
/// preserved verbatim so the catalog entry can be handed back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedPayment {
    #[serde(default)]
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount_required: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AcceptedPayment {
    /// Price in atomic units. Facilitators send it as a decimal string, but
    /// plain numbers are accepted too.
    pub fn amount(&self) -> Option<u64> {
        match self.max_amount_required.as_ref()? {
            Value::String(text) => text.parse().ok(),
            Value::Number(number) => number.as_u64(),
            _ => None,
        }
    }
}

/// A payable resource listed by the facilitator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredService {
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub accepts: Vec<AcceptedPayment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DiscoveredService {
    /// The primary (first) payment option.
    pub fn primary_payment(&self) -> Option<&AcceptedPayment> {
        self.accepts.first()
    }
}

/// Discovery list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryList {
    #[serde(default)]
    pub x402_version: u32,
    #[serde(default)]
    pub items: Vec<DiscoveredService>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Value>,
}

/// Client for a facilitator's discovery endpoint.
#[derive(Debug, Clone)]
pub struct FacilitatorClient {
    http: HttpTransport,
}

impl FacilitatorClient {
    pub fn new(http: HttpTransport) -> Self {
        Self { http }
    }

    /// List the facilitator's catalog, bounded by `limit`.
    pub async fn list(&self, facilitator: &Url, limit: u32) -> ClientResult<DiscoveryList> {
        let url = join_segments(facilitator, &["discovery", "resources"])?;
        let list: DiscoveryList = self.http.get_with_query(url, &[("limit", limit)]).await?;

        tracing::debug!(
            facilitator = %facilitator,
            items = list.items.len(),
            "Fetched facilitator catalog"
        );
        Ok(list)
    }
}

/// A facilitator known to settle Solana payments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownFacilitator {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    pub networks: &'static [&'static str],
}

/// Facilitators with Solana support.
pub const KNOWN_SOLANA_FACILITATORS: &[KnownFacilitator] = &[
    KnownFacilitator {
        id: "payai",
        name: "PayAI",
        url: "https://facilitator.payai.network",
        networks: &["solana", "solana-devnet"],
    },
    KnownFacilitator {
        id: "corbits",
        name: "Corbits",
        url: "https://facilitator.corbits.dev",
        networks: &["solana", "solana-devnet"],
    },
    KnownFacilitator {
        id: "coinbase",
        name: "Coinbase CDP",
        url: "https://api.cdp.coinbase.com/platform/v2/x402",
        networks: &["solana", "solana-devnet"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_catalog() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/discovery/resources"))
            .and(query_param("limit", "25"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "x402Version": 1,
                "items": [{
                    "resource": "https://api.example.com/weather",
                    "type": "http",
                    "accepts": [{
                        "scheme": "exact",
                        "network": "solana-devnet",
                        "maxAmountRequired": "5000",
                        "payTo": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"
                    }]
                }]
            })))
            .mount(&server)
            .await;

        let http = HttpTransport::new(Arc::new(ClientConfig::default())).unwrap();
        let client = FacilitatorClient::new(http);
        let facilitator = Url::parse(&server.uri()).unwrap();

        let list = client.list(&facilitator, 25).await.unwrap();
        assert_eq!(list.x402_version, 1);
        assert_eq!(list.items.len(), 1);

        let payment = list.items[0].primary_payment().unwrap();
        assert_eq!(payment.network, "solana-devnet");
        assert_eq!(payment.amount(), Some(5000));

        // Untyped fields survive the round trip.
        let back = serde_json::to_value(&list.items[0]).unwrap();
        assert_eq!(back["type"], "http");
        assert_eq!(back["accepts"][0]["payTo"], "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin");
    }

    #[test]
    fn test_amount_accepts_numbers_and_strings() {
        let payment: AcceptedPayment =
            serde_json::from_value(serde_json::json!({"network": "solana", "maxAmountRequired": 42}))
                .unwrap();
        assert_eq!(payment.amount(), Some(42));

        let payment: AcceptedPayment =
            serde_json::from_value(serde_json::json!({"network": "solana", "maxAmountRequired": "abc"}))
                .unwrap();
        assert_eq!(payment.amount(), None);
    }
}
