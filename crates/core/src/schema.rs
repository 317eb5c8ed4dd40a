// JSON Schema describing every recognized session option

use crate::config::{DEFAULT_DEVNET_RPC_URL, DEFAULT_FACILITATOR_URL};
use serde_json::{json, Value};

/// Build the configuration discovery document served at
/// `/.well-known/mcp-config`.
pub fn config_schema(schema_id: &str) -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": schema_id,
        "title": "Solx402 MCP Server Configuration",
        "description": "Configuration for connecting to the Solx402 MCP server",
        "x-query-style": "dot+bracket",
        "type": "object",
        "properties": {
            "isMainnet": {
                "type": "boolean",
                "title": "Use Mainnet",
                "description": "Set to true for mainnet, false for devnet",
                "default": false
            },
            "facilitatorUrl": {
                "type": "string",
                "format": "uri",
                "title": "Facilitator URL",
                "description": "URL of the x402 facilitator",
                "default": DEFAULT_FACILITATOR_URL
            },
            "maxPrice": {
                "type": "integer",
                "title": "Max Price",
                "description": "Maximum price to pay for services in USDC atomic units. e.g 10000 = 0.01 USDC",
                "default": 0,
                "minimum": 0
            },
            "privateKey": {
                "type": "string",
                "title": "Private Key",
                "description": "Private key in Bs58 format",
                "x-secret": true
            },
            "mainnetRpcUrl": {
                "type": "string",
                "format": "uri",
                "title": "Mainnet RPC URL",
                "description": "RPC URL for Solana mainnet"
            },
            "devnetRpcUrl": {
                "type": "string",
                "format": "uri",
                "title": "Devnet RPC URL",
                "description": "RPC URL for Solana devnet",
                "default": DEFAULT_DEVNET_RPC_URL
            },
            "useSolanaMcpServer": {
                "type": "boolean",
                "title": "Use Solana MCP Server",
                "description": "Set to true to use Solana MCP Server. Default false",
                "default": false
            }
        },
        "required": ["privateKey", "mainnetRpcUrl"],
        "additionalProperties": false
    })
}
