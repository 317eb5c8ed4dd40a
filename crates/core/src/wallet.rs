// Credential/signing collaborator

use crate::config::{Network, PrivateKey};
use crate::error::WalletError;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Payment terms a service advertises in its HTTP 402 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    pub max_amount_required: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mime_type: String,
    pub pay_to: String,
    #[serde(default)]
    pub max_timeout_seconds: u64,
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl PaymentRequirements {
    /// Amount in atomic units, if it parses.
    pub fn amount(&self) -> Option<u64> {
        self.max_amount_required.parse().ok()
    }
}

/// Signed payment sent back to the service in the `X-PAYMENT` header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: serde_json::Value,
}

impl PaymentPayload {
    /// Header encoding: base64 of the JSON payload.
    pub fn to_header(&self) -> Result<String, WalletError> {
        let json = serde_json::to_vec(self)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }
}

/// Capability to authorize value transfers on behalf of a session wallet.
pub trait PaymentSigner: Send + Sync {
    /// Base58 public key of the wallet.
    fn public_key(&self) -> String;

    /// Authorize paying the given requirements.
    fn authorize(
        &self,
        x402_version: u32,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentPayload, WalletError>;
}

/// ed25519 key pair decoded from a 64-byte base58 secret key.
pub struct KeypairSigner {
    signing_key: SigningKey,
}

impl KeypairSigner {
    /// Decode the session credential. The trailing 32 bytes must be the
    /// public half of the leading 32-byte seed.
    pub fn from_private_key(key: &PrivateKey) -> Result<Self, WalletError> {
        let bytes = bs58::decode(key.expose().trim()).into_vec()?;
        let keypair: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::InvalidLength(bytes.len()))?;

        let signing_key =
            SigningKey::from_keypair_bytes(&keypair).map_err(|_| WalletError::KeyMismatch)?;
        Ok(Self { signing_key })
    }

    /// Decode an optional credential, failing when the session has none.
    pub fn from_session_key(key: Option<&PrivateKey>) -> Result<Self, WalletError> {
        key.ok_or(WalletError::MissingKey).and_then(Self::from_private_key)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl PaymentSigner for KeypairSigner {
    fn public_key(&self) -> String {
        bs58::encode(self.verifying_key().as_bytes()).into_string()
    }

    fn authorize(
        &self,
        x402_version: u32,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentPayload, WalletError> {
        let message = serde_json::to_vec(requirements)?;
        let signature = self.signing_key.sign(&message);

        tracing::debug!(
            network = %requirements.network,
            amount = %requirements.max_amount_required,
            "Authorized payment"
        );

        Ok(PaymentPayload {
            x402_version,
            scheme: requirements.scheme.clone(),
            network: requirements.network.clone(),
            payload: serde_json::json!({
                "payer": self.public_key(),
                "payTo": requirements.pay_to,
                "asset": requirements.asset,
                "amount": requirements.max_amount_required,
                "signature": bs58::encode(signature.to_bytes()).into_string(),
            }),
        })
    }
}

/// Pick the requirement matching the session network, if any.
pub fn select_requirements(
    accepts: &[PaymentRequirements],
    network: Network,
) -> Option<&PaymentRequirements> {
    accepts.iter().find(|r| r.network == network.x402_name())
}
