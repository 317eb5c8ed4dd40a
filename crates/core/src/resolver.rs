//! Resolution of raw request parameters into a [`SessionConfig`].
//!
//! Options arrive as query parameters using dot+bracket addressing
//! (`clients.docs=...`, `clients[docs]=...`) and/or as a base64-encoded JSON
//! object in the `config` parameter. Each query value is read as JSON when it
//! parses (`true`, `10000`) and as a plain string otherwise.
//!
//! Resolution is pure: it performs no I/O and never touches credentials
//! beyond copying them into the resulting configuration.

use crate::config::{
    default_devnet_rpc_url, default_facilitator_url, Network, PrivateKey, SessionConfig,
    DUMMY_SENTINEL,
};
use crate::error::{ConfigError, FieldIssue};
use base64::Engine;
use serde_json::{Map, Value};
use url::Url;

/// Query parameter carrying a base64 JSON configuration object.
pub const CONFIG_PARAM: &str = "config";

/// Environment variables read by the single-session stdio variant.
pub const ENV_OPTIONS: &[(&str, &str)] = &[
    ("IS_MAINNET", "isMainnet"),
    ("FACILITATOR_URL", "facilitatorUrl"),
    ("MAX_PRICE", "maxPrice"),
    ("PRIVATE_KEY", "privateKey"),
    ("MAINNET_RPC_URL", "mainnetRpcUrl"),
    ("DEVNET_RPC_URL", "devnetRpcUrl"),
    ("USE_SOLANA_MCP_SERVER", "useSolanaMcpServer"),
];

/// Options whose values are kept verbatim, never coerced from JSON.
const STRING_OPTIONS: &[&str] = &["privateKey", "facilitatorUrl", "mainnetRpcUrl", "devnetRpcUrl"];

/// Outcome of resolving one request's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// All mandatory options present; defaults applied to the rest.
    Valid(SessionConfig),
    /// Mandatory options missing, but the request carries the scanner
    /// placeholder. Served with a synthetic devnet configuration.
    Dummy(SessionConfig),
    /// Mandatory options missing or malformed.
    Invalid(ConfigError),
}

impl Resolution {
    /// Collapse into a configuration, treating dummy probes as servable.
    pub fn into_config(self) -> Result<SessionConfig, ConfigError> {
        match self {
            Self::Valid(config) | Self::Dummy(config) => Ok(config),
            Self::Invalid(err) => Err(err),
        }
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self, Self::Dummy(_))
    }
}

/// Raw, unvalidated configuration options attached to a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawParams {
    values: Map<String, Value>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an already structured JSON object.
    pub fn from_object(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Parse a URL query string (without the leading `?`).
    pub fn from_query(query: &str) -> Result<Self, ConfigError> {
        Self::from_pairs(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned())),
        )
    }

    /// Build from decoded key/value pairs.
    ///
    /// The base64 `config` object is applied first so that individual keys
    /// override it.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::new();
        let mut addressed = Vec::new();

        for (key, value) in pairs {
            if key == CONFIG_PARAM {
                params.merge_encoded(&value)?;
            } else {
                addressed.push((key, value));
            }
        }

        for (key, value) in addressed {
            params.insert_addressed(&key, parse_scalar(&key, &value));
        }

        Ok(params)
    }

    /// Read the stdio variant's options from environment-style pairs.
    pub fn from_env<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::new();
        for (name, value) in vars {
            // An empty variable means the option is unset
            if value.is_empty() {
                continue;
            }
            if let Some((_, key)) = ENV_OPTIONS.iter().find(|(env, _)| *env == name) {
                params.insert_addressed(key, parse_scalar(key, &value));
            }
        }
        params
    }

    /// Insert a value at a dot+bracket address, creating objects on the way.
    pub fn insert_addressed(&mut self, address: &str, value: Value) {
        let segments = split_address(address);
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut cursor = &mut self.values;
        for segment in parents {
            let entry = cursor
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            cursor = match entry {
                Value::Object(map) => map,
                _ => unreachable!("entry was just made an object"),
            };
        }
        cursor.insert(last.clone(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.values
    }

    fn merge_encoded(&mut self, encoded: &str) -> Result<(), ConfigError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(encoded.trim()))
            .map_err(|e| ConfigError::MalformedEncoding(e.to_string()))?;
        let decoded: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ConfigError::MalformedEncoding(e.to_string()))?;
        match decoded {
            Value::Object(map) => {
                self.values.extend(map);
                Ok(())
            }
            _ => Err(ConfigError::MalformedEncoding(
                "expected a JSON object".to_string(),
            )),
        }
    }

    /// Whether a scanner placeholder stands in for a mandatory option.
    fn carries_sentinel(&self) -> bool {
        ["privateKey", "mainnetRpcUrl"]
            .iter()
            .any(|key| self.get(key).and_then(Value::as_str) == Some(DUMMY_SENTINEL))
    }
}

/// Classify a request's raw parameters.
pub fn resolve(params: &RawParams) -> Resolution {
    match validate(params) {
        Ok(config) => Resolution::Valid(config),
        Err(_) if params.carries_sentinel() => {
            tracing::info!("Detected dummy config for deployment scanning");
            Resolution::Dummy(SessionConfig::dummy())
        }
        Err(err) => Resolution::Invalid(err),
    }
}

fn validate(params: &RawParams) -> Result<SessionConfig, ConfigError> {
    let mut issues = Vec::new();

    let is_mainnet = optional_bool(params, "isMainnet", &mut issues).unwrap_or(false);
    let facilitator_url =
        optional_url(params, "facilitatorUrl", &mut issues).unwrap_or_else(default_facilitator_url);
    let max_price = optional_price(params, "maxPrice", &mut issues).unwrap_or(0);
    let private_key = required_string(params, "privateKey", &mut issues).map(PrivateKey::new);
    let mainnet_rpc_url = required_url(params, "mainnetRpcUrl", &mut issues);
    let devnet_rpc_url =
        optional_url(params, "devnetRpcUrl", &mut issues).unwrap_or_else(default_devnet_rpc_url);
    let use_solana_mcp_server =
        optional_bool(params, "useSolanaMcpServer", &mut issues).unwrap_or(false);

    match (private_key, mainnet_rpc_url) {
        (Some(private_key), Some(mainnet_rpc_url)) if issues.is_empty() => Ok(SessionConfig {
            network: Network::from_mainnet_flag(is_mainnet),
            facilitator_url,
            max_price,
            private_key: Some(private_key),
            mainnet_rpc_url: Some(mainnet_rpc_url),
            devnet_rpc_url,
            use_solana_mcp_server,
        }),
        _ => Err(ConfigError::Invalid(issues)),
    }
}

fn optional_bool(params: &RawParams, key: &str, issues: &mut Vec<FieldIssue>) -> Option<bool> {
    match params.get(key)? {
        Value::Bool(flag) => Some(*flag),
        Value::Null => None,
        _ => {
            issues.push(FieldIssue::new(key, "Expected boolean"));
            None
        }
    }
}

fn optional_price(params: &RawParams, key: &str, issues: &mut Vec<FieldIssue>) -> Option<u64> {
    match params.get(key)? {
        Value::Number(number) => match number.as_u64() {
            Some(price) => Some(price),
            None => {
                issues.push(FieldIssue::new(key, "Expected a non-negative integer"));
                None
            }
        },
        Value::Null => None,
        _ => {
            issues.push(FieldIssue::new(key, "Expected number"));
            None
        }
    }
}

fn string_value(value: &Value) -> Option<String> {
    // Query values that happen to look like JSON scalars are still valid strings.
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn required_string(params: &RawParams, key: &str, issues: &mut Vec<FieldIssue>) -> Option<String> {
    match params.get(key) {
        None | Some(Value::Null) => {
            issues.push(FieldIssue::new(key, "Required"));
            None
        }
        Some(value) => match string_value(value) {
            Some(text) if !text.is_empty() => Some(text),
            Some(_) => {
                issues.push(FieldIssue::new(key, "Must not be empty"));
                None
            }
            None => {
                issues.push(FieldIssue::new(key, "Expected string"));
                None
            }
        },
    }
}

fn parse_url(key: &str, value: &Value, issues: &mut Vec<FieldIssue>) -> Option<Url> {
    let Some(text) = string_value(value) else {
        issues.push(FieldIssue::new(key, "Expected string"));
        return None;
    };
    match Url::parse(&text) {
        Ok(url) => Some(url),
        Err(e) => {
            issues.push(FieldIssue::new(key, format!("Invalid url: {}", e)));
            None
        }
    }
}

fn optional_url(params: &RawParams, key: &str, issues: &mut Vec<FieldIssue>) -> Option<Url> {
    match params.get(key)? {
        Value::Null => None,
        value => parse_url(key, value, issues),
    }
}

fn required_url(params: &RawParams, key: &str, issues: &mut Vec<FieldIssue>) -> Option<Url> {
    match params.get(key) {
        None | Some(Value::Null) => {
            issues.push(FieldIssue::new(key, "Required"));
            None
        }
        Some(value) => parse_url(key, value, issues),
    }
}

fn parse_scalar(key: &str, raw: &str) -> Value {
    if STRING_OPTIONS.contains(&key) {
        return Value::String(raw.to_string());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Split `a.b[c][0]` into `["a", "b", "c", "0"]`.
fn split_address(address: &str) -> Vec<String> {
    address
        .split(|c: char| c == '.' || c == '[' || c == ']')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "4wBqpZM9xaSheZzJSMawUHDgZ7miWfSsxmfVF5jJpYP";

    fn query(q: &str) -> RawParams {
        RawParams::from_query(q).unwrap()
    }

    #[test]
    fn test_valid_applies_defaults() {
        let params = query(&format!(
            "privateKey={}&mainnetRpcUrl=https%3A%2F%2Frpc.example.com",
            KEY
        ));

        let Resolution::Valid(config) = resolve(&params) else {
            panic!("expected valid configuration");
        };
        assert_eq!(config.network, Network::Devnet);
        assert_eq!(config.facilitator_url.as_str(), "https://facilitator.payai.network/");
        assert_eq!(config.max_price, 0);
        assert_eq!(config.devnet_rpc_url.as_str(), "https://api.devnet.solana.com/");
        assert!(!config.use_solana_mcp_server);
        assert_eq!(config.private_key.unwrap().expose(), KEY);
        assert_eq!(
            config.mainnet_rpc_url.unwrap().as_str(),
            "https://rpc.example.com/"
        );
    }

    #[test]
    fn test_valid_reads_every_option() {
        let params = query(&format!(
            "privateKey={}&mainnetRpcUrl=https://rpc.example.com&isMainnet=true&maxPrice=10000\
             &facilitatorUrl=https://fac.example.com&devnetRpcUrl=https://dev.example.com\
             &useSolanaMcpServer=true",
            KEY
        ));

        let Resolution::Valid(config) = resolve(&params) else {
            panic!("expected valid configuration");
        };
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.max_price, 10_000);
        assert_eq!(config.facilitator_url.host_str(), Some("fac.example.com"));
        assert_eq!(config.devnet_rpc_url.host_str(), Some("dev.example.com"));
        assert!(config.use_solana_mcp_server);
    }

    #[test]
    fn test_missing_mandatory_is_invalid() {
        let Resolution::Invalid(err) = resolve(&query("isMainnet=false")) else {
            panic!("expected invalid configuration");
        };
        let paths: Vec<_> = err.issues().into_iter().map(|i| i.path).collect();
        assert_eq!(paths, vec!["privateKey", "mainnetRpcUrl"]);
    }

    #[test]
    fn test_wrong_types_are_invalid() {
        let params = query(&format!(
            "privateKey={}&mainnetRpcUrl=https://rpc.example.com&isMainnet=yes&maxPrice=-5",
            KEY
        ));
        let Resolution::Invalid(err) = resolve(&params) else {
            panic!("expected invalid configuration");
        };
        let paths: Vec<_> = err.issues().into_iter().map(|i| i.path).collect();
        assert_eq!(paths, vec!["isMainnet", "maxPrice"]);
    }

    #[test]
    fn test_sentinel_private_key_is_dummy() {
        let resolution = resolve(&query("privateKey=string"));
        assert_eq!(resolution, Resolution::Dummy(SessionConfig::dummy()));
    }

    #[test]
    fn test_sentinel_rpc_url_is_dummy() {
        let resolution = resolve(&query("mainnetRpcUrl=string&maxPrice=500"));
        assert!(resolution.is_dummy());
        let config = resolution.into_config().unwrap();
        assert_eq!(config.max_price, 0);
        assert!(config.private_key.is_none());
    }

    #[test]
    fn test_sentinel_with_complete_config_is_valid() {
        let params = query("privateKey=string&mainnetRpcUrl=https://rpc.example.com");
        assert!(matches!(resolve(&params), Resolution::Valid(_)));
    }

    #[test]
    fn test_numeric_looking_key_stays_a_string() {
        let params = query("privateKey=12345&mainnetRpcUrl=https://rpc.example.com");
        let config = resolve(&params).into_config().unwrap();
        assert_eq!(config.private_key.unwrap().expose(), "12345");
    }

    #[test]
    fn test_long_numeric_key_is_kept_verbatim() {
        let params = query("privateKey=12345678901234567890123&mainnetRpcUrl=https://rpc.example.com");
        assert_eq!(params.get("privateKey"), Some(&Value::from("12345678901234567890123")));

        let config = resolve(&params).into_config().unwrap();
        assert_eq!(config.private_key.unwrap().expose(), "12345678901234567890123");
        // Non-string options are still coerced
        assert_eq!(query("maxPrice=10000").get("maxPrice"), Some(&Value::from(10000)));
    }

    #[test]
    fn test_base64_config_param_with_override() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(
            serde_json::json!({
                "privateKey": KEY,
                "mainnetRpcUrl": "https://rpc.example.com",
                "maxPrice": 100
            })
            .to_string(),
        );
        let params = RawParams::from_pairs(vec![
            ("maxPrice".to_string(), "250".to_string()),
            (CONFIG_PARAM.to_string(), encoded),
        ])
        .unwrap();

        let config = resolve(&params).into_config().unwrap();
        assert_eq!(config.max_price, 250);
    }

    #[test]
    fn test_malformed_config_param() {
        let err = RawParams::from_query("config=%%%not-base64").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedEncoding(_)));
    }

    #[test]
    fn test_dot_and_bracket_addressing() {
        let params = query("a.b=1&a[c]=true&d[e][f]=x");
        assert_eq!(
            Value::Object(params.as_object().clone()),
            serde_json::json!({ "a": { "b": 1, "c": true }, "d": { "e": { "f": "x" } } })
        );
    }

    #[test]
    fn test_from_env() {
        let params = RawParams::from_env(vec![
            ("PRIVATE_KEY".to_string(), KEY.to_string()),
            ("MAINNET_RPC_URL".to_string(), "https://rpc.example.com".to_string()),
            ("IS_MAINNET".to_string(), "true".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);

        let config = resolve(&params).into_config().unwrap();
        assert_eq!(config.network, Network::Mainnet);
        assert!(params.get("HOME").is_none());
    }

    #[test]
    fn test_from_env_skips_empty_values() {
        let params = RawParams::from_env(vec![
            ("PRIVATE_KEY".to_string(), KEY.to_string()),
            ("MAINNET_RPC_URL".to_string(), "https://rpc.example.com".to_string()),
            ("MAX_PRICE".to_string(), String::new()),
            ("IS_MAINNET".to_string(), String::new()),
            ("FACILITATOR_URL".to_string(), String::new()),
        ]);
        assert!(params.get("maxPrice").is_none());

        let config = resolve(&params).into_config().unwrap();
        assert_eq!(config.max_price, 0);
        assert_eq!(config.network, Network::Devnet);
        assert_eq!(config.facilitator_url.as_str(), "https://facilitator.payai.network/");
    }
}
