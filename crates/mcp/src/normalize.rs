// Tool result normalization

use crate::protocol::{CallToolResult, ToolContent};
use base64::Engine;
use serde_json::Value;

/// Non-textual payload a tool may attach to a content item.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Binary(Vec<u8>),
    Json(Value),
}

/// Content item as a tool produces it, before it is shaped for the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawContent {
    pub text: Option<String>,
    pub payload: Option<RawPayload>,
    pub mime_type: Option<String>,
}

impl RawContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn binary(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            payload: Some(RawPayload::Binary(bytes)),
            mime_type: Some(mime_type.into()),
            ..Default::default()
        }
    }

    pub fn json(value: Value) -> Self {
        Self {
            payload: Some(RawPayload::Json(value)),
            ..Default::default()
        }
    }
}

/// Heterogeneous output of a tool callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawToolResult {
    pub content: Vec<RawContent>,
    pub is_error: bool,
}

impl RawToolResult {
    pub fn new(content: Vec<RawContent>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// Single text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![RawContent::text(text)])
    }

    /// Single text item holding pretty-printed JSON.
    pub fn pretty_json(value: &Value) -> Self {
        let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        Self::text(text)
    }

    /// Failure reported as data: `{ error, reason }`.
    pub fn failure(error: &str, reason: impl std::fmt::Display) -> Self {
        let mut result = Self::pretty_json(&serde_json::json!({
            "error": error,
            "reason": reason.to_string(),
        }));
        result.is_error = true;
        result
    }
}

/// Shape a raw tool result for the wire. Every item comes out with kind
/// `text` and a concrete text: its own, else the payload coerced to a
/// string, else empty.
pub fn normalize(raw: RawToolResult) -> CallToolResult {
    let content = raw.content.into_iter().map(normalize_item).collect();
    CallToolResult {
        content,
        is_error: raw.is_error.then_some(true),
    }
}

fn normalize_item(item: RawContent) -> ToolContent {
    let data = match &item.payload {
        Some(RawPayload::Binary(bytes)) => {
            Some(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        _ => None,
    };

    let text = match (item.text, &item.payload) {
        (Some(text), _) => text,
        (None, Some(RawPayload::Binary(_))) => data.clone().unwrap_or_default(),
        (None, Some(RawPayload::Json(Value::String(s)))) => s.clone(),
        (None, Some(RawPayload::Json(Value::Null))) => String::new(),
        (None, Some(RawPayload::Json(other))) => other.to_string(),
        (None, None) => String::new(),
    };

    ToolContent::Text {
        text,
        mime_type: item.mime_type,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_is_kept() {
        let result = normalize(RawToolResult::text("hello"));
        assert_eq!(result.content, vec![ToolContent::text("hello")]);
        assert_eq!(result.is_error, None);
    }

    #[test]
    fn test_binary_becomes_base64_text() {
        let result = normalize(RawToolResult::new(vec![RawContent::binary(
            b"hi".to_vec(),
            "image/avif",
        )]));
        assert_eq!(
            result.content[0],
            ToolContent::Text {
                text: "aGk=".to_string(),
                mime_type: Some("image/avif".to_string()),
                data: Some("aGk=".to_string()),
            }
        );
    }

    #[test]
    fn test_absent_content_becomes_empty_text() {
        let result = normalize(RawToolResult::new(vec![RawContent::default()]));
        assert_eq!(result.content[0].as_text(), "");

        let result = normalize(RawToolResult::new(vec![RawContent::json(Value::Null)]));
        assert_eq!(result.content[0].as_text(), "");
    }

    #[test]
    fn test_json_payload_is_coerced() {
        let result = normalize(RawToolResult::new(vec![
            RawContent::json(json!(42)),
            RawContent::json(json!("plain")),
            RawContent::json(json!({"a": 1})),
        ]));
        let texts: Vec<&str> = result.content.iter().map(ToolContent::as_text).collect();
        assert_eq!(texts, vec!["42", "plain", r#"{"a":1}"#]);
    }

    #[test]
    fn test_own_text_wins_over_payload() {
        let item = RawContent {
            text: Some("caption".to_string()),
            payload: Some(RawPayload::Binary(vec![1, 2, 3])),
            mime_type: Some("image/png".to_string()),
        };
        let result = normalize(RawToolResult::new(vec![item]));
        assert_eq!(result.content[0].as_text(), "caption");
    }

    #[test]
    fn test_failure_sets_error_flag() {
        let result = normalize(RawToolResult::failure("Request timed out", "deadline elapsed"));
        assert_eq!(result.is_error, Some(true));
        let body: Value = serde_json::from_str(result.content[0].as_text()).unwrap();
        assert_eq!(body, json!({"error": "Request timed out", "reason": "deadline elapsed"}));
    }
}
