// Wallet tools

use super::client_failure;
use crate::normalize::RawToolResult;
use crate::protocol::ToolSchema;
use crate::tools::{json_schema_empty, Tool};
use anyhow::Result;
use serde_json::{json, Value};
use solx402_clients::{ClientError, SolanaRpcClient};
use solx402_core::address::{associated_token_address, Address};
use solx402_core::config::USDC_DECIMALS;
use solx402_core::wallet::{KeypairSigner, PaymentSigner};
use solx402_core::SessionConfig;
use tracing::warn;

/// Reports the configured wallet's public key.
pub struct PublicKeyTool;

#[async_trait::async_trait]
impl Tool for PublicKeyTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_wallet_public_key".to_string(),
            title: Some("Get Wallet Public Key".to_string()),
            description: "Retrieve the public key of the configured wallet.".to_string(),
            input_schema: json_schema_empty(),
        }
    }

    async fn execute(&self, _arguments: Value, config: &SessionConfig) -> Result<RawToolResult> {
        match KeypairSigner::from_session_key(config.private_key.as_ref()) {
            Ok(signer) => Ok(RawToolResult::pretty_json(&json!({
                "walletPublicKey": signer.public_key(),
                "network": config.network,
            }))),
            Err(e) => Ok(RawToolResult::failure("Failed to fetch wallet public key", e)),
        }
    }
}

/// Reads the wallet's USDC balance from its associated token account.
pub struct UsdcBalanceTool {
    rpc: SolanaRpcClient,
}

impl UsdcBalanceTool {
    pub fn new(rpc: SolanaRpcClient) -> Self {
        Self { rpc }
    }

    async fn balance(&self, config: &SessionConfig) -> Result<Value> {
        let network = config.network;
        let rpc_url = config
            .rpc_url()
            .ok_or_else(|| anyhow::anyhow!("no RPC URL configured for {}", network.cluster()))?;

        let signer = KeypairSigner::from_session_key(config.private_key.as_ref())?;
        let wallet: Address = signer.public_key().parse()?;
        let mint: Address = network.usdc_mint().parse()?;
        let token_account = associated_token_address(&wallet, &mint)?.to_string();

        // A wallet that never held USDC has no token account yet.
        let (balance, account_exists) = match self
            .rpc
            .token_account_balance(rpc_url, &token_account)
            .await
            .and_then(|amount| amount.atomic())
        {
            Ok(amount) => (amount, true),
            Err(e @ ClientError::Timeout) => return Err(e.into()),
            Err(e) => {
                warn!(account = %token_account, error = %e, "Token account not found or error");
                (0, false)
            }
        };

        Ok(json!({
            "wallet": wallet.to_string(),
            "network": network.cluster(),
            "tokenAccount": token_account,
            "accountExists": account_exists,
            "balance": balance,
            "balanceFormatted": format_usdc(balance),
            "symbol": "USDC",
            "mint": mint.to_string(),
        }))
    }
}

/// Atomic units to a fixed six-decimal string.
pub fn format_usdc(amount: u64) -> String {
    let scale = 10u64.pow(USDC_DECIMALS);
    format!(
        "{}.{:0width$}",
        amount / scale,
        amount % scale,
        width = USDC_DECIMALS as usize
    )
}

#[async_trait::async_trait]
impl Tool for UsdcBalanceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_wallet_usdc_balance".to_string(),
            title: Some("Get Wallet USDC Balance".to_string()),
            description: "Retrieve the USDC balance of the configured wallet.".to_string(),
            input_schema: json_schema_empty(),
        }
    }

    async fn execute(&self, _arguments: Value, config: &SessionConfig) -> Result<RawToolResult> {
        match self.balance(config).await {
            Ok(body) => Ok(RawToolResult::pretty_json(&body)),
            Err(e) => match e.downcast_ref::<ClientError>() {
                Some(client) => Ok(client_failure("Failed to fetch USDC balance", client)),
                None => Ok(RawToolResult::failure("Failed to fetch USDC balance", e)),
            },
        }
    }
}
