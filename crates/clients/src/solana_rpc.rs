//! Solana JSON-RPC client, limited to token balance lookups.

use crate::error::{ClientError, ClientResult};
use crate::transport::HttpTransport;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

/// Balance of a token account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    /// Raw amount in atomic units, as a decimal string
    pub amount: String,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn atomic(&self) -> ClientResult<u64> {
        self.amount
            .parse()
            .map_err(|_| ClientError::Protocol(format!("invalid token amount {}", self.amount)))
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ValueWrapper<T> {
    value: T,
}

/// Client for Solana JSON-RPC endpoints. The endpoint is chosen per call
/// because it comes from the session configuration.
#[derive(Debug, Clone)]
pub struct SolanaRpcClient {
    http: HttpTransport,
}

impl SolanaRpcClient {
    pub fn new(http: HttpTransport) -> Self {
        Self { http }
    }

    /// Balance of a token account. Fails with an RPC error when the account
    /// does not exist.
    pub async fn token_account_balance(&self, rpc: &Url, account: &str) -> ClientResult<TokenAmount> {
        let result = self
            .call(rpc, "getTokenAccountBalance", json!([account]))
            .await?;
        let wrapper: ValueWrapper<TokenAmount> = serde_json::from_value(result)?;
        Ok(wrapper.value)
    }

    async fn call(&self, rpc: &Url, method: &str, params: Value) -> ClientResult<Value> {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        let envelope: RpcEnvelope = self.http.post_json(rpc.clone(), &body).await?;

        if let Some(error) = envelope.error {
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        envelope
            .result
            .ok_or_else(|| ClientError::Protocol(format!("{} returned no result", method)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> SolanaRpcClient {
        SolanaRpcClient::new(HttpTransport::new(Arc::new(ClientConfig::default())).unwrap())
    }

    #[tokio::test]
    async fn test_token_account_balance() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "getTokenAccountBalance",
                "params": ["TokenAccount1111111111111111111111111111111"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "context": {"slot": 1},
                    "value": {"amount": "1250000", "decimals": 6, "uiAmountString": "1.25"}
                }
            })))
            .mount(&server)
            .await;

        let rpc = Url::parse(&server.uri()).unwrap();
        let balance = client()
            .token_account_balance(&rpc, "TokenAccount1111111111111111111111111111111")
            .await
            .unwrap();
        assert_eq!(balance.atomic().unwrap(), 1_250_000);
        assert_eq!(balance.decimals, 6);
    }

    #[tokio::test]
    async fn test_missing_account_is_rpc_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32602, "message": "Invalid param: could not find account"}
            })))
            .mount(&server)
            .await;

        let rpc = Url::parse(&server.uri()).unwrap();
        let err = client().token_account_balance(&rpc, "x").await.unwrap_err();
        assert!(matches!(err, ClientError::Rpc { code: -32602, .. }));
    }
}
