// Per-request session configuration

use serde::{Serialize, Serializer};
use url::Url;

/// Facilitator used when a request does not name one.
pub const DEFAULT_FACILITATOR_URL: &str = "https://facilitator.payai.network";

/// Public devnet RPC endpoint used when a request does not name one.
pub const DEFAULT_DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// Placeholder value deployment scanners send in place of real credentials.
pub const DUMMY_SENTINEL: &str = "string";

/// USDC uses 6 decimals on every cluster.
pub const USDC_DECIMALS: u32 = 6;

/// Network a session operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Network {
    Mainnet,
    #[default]
    Devnet,
}

impl Network {
    pub fn from_mainnet_flag(is_mainnet: bool) -> Self {
        if is_mainnet {
            Self::Mainnet
        } else {
            Self::Devnet
        }
    }

    pub fn is_mainnet(self) -> bool {
        matches!(self, Self::Mainnet)
    }

    /// Network identifier used by x402 payment requirements.
    pub fn x402_name(self) -> &'static str {
        match self {
            Self::Mainnet => "solana",
            Self::Devnet => "solana-devnet",
        }
    }

    /// Cluster identifier used by Solana tooling.
    pub fn cluster(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet-beta",
            Self::Devnet => "devnet",
        }
    }

    /// Mint address of USDC on this cluster.
    pub fn usdc_mint(self) -> &'static str {
        match self {
            Self::Mainnet => "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            Self::Devnet => "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.x402_name())
    }
}

impl Serialize for Network {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.x402_name())
    }
}

/// Base58-encoded secret key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Resolved operating parameters for exactly one request.
///
/// Built by [`crate::resolver::resolve`] and never mutated afterwards.
/// Dummy sessions (deployment probes) carry no credential and no mainnet RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub network: Network,
    pub facilitator_url: Url,
    /// Price ceiling in atomic USDC units; zero means unlimited
    pub max_price: u64,
    pub private_key: Option<PrivateKey>,
    pub mainnet_rpc_url: Option<Url>,
    pub devnet_rpc_url: Url,
    /// Enables the optional Solana expert tool set
    pub use_solana_mcp_server: bool,
}

impl SessionConfig {
    /// Synthetic configuration handed to deployment scanners.
    pub fn dummy() -> Self {
        Self {
            network: Network::Devnet,
            facilitator_url: default_facilitator_url(),
            max_price: 0,
            private_key: None,
            mainnet_rpc_url: None,
            devnet_rpc_url: default_devnet_rpc_url(),
            use_solana_mcp_server: false,
        }
    }

    /// RPC endpoint for the session network, if one is configured.
    pub fn rpc_url(&self) -> Option<&Url> {
        match self.network {
            Network::Mainnet => self.mainnet_rpc_url.as_ref(),
            Network::Devnet => Some(&self.devnet_rpc_url),
        }
    }

    /// Whether a service price passes the session's ceiling.
    pub fn within_price_ceiling(&self, amount: u64) -> bool {
        self.max_price == 0 || amount <= self.max_price
    }

    /// Fields that are safe to log.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "isMainnet": self.network.is_mainnet(),
            "facilitatorUrl": self.facilitator_url.as_str(),
            "maxPrice": self.max_price,
            "useSolanaMcpServer": self.use_solana_mcp_server,
        })
    }
}

pub(crate) fn default_facilitator_url() -> Url {
    Url::parse(DEFAULT_FACILITATOR_URL).expect("default facilitator URL is valid")
}

pub(crate) fn default_devnet_rpc_url() -> Url {
    Url::parse(DEFAULT_DEVNET_RPC_URL).expect("default devnet RPC URL is valid")
}
