// MCP tool definitions and registry

use crate::normalize::RawToolResult;
use crate::protocol::ToolSchema;
use anyhow::Result;
use serde_json::Value;
use solx402_core::SessionConfig;
use std::collections::HashSet;
use std::sync::Arc;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool schema for MCP
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with the caller's arguments and the session it runs in.
    ///
    /// Failures of the remote work are reported inside the result. An `Err`
    /// means the call itself was unusable (e.g. malformed arguments).
    async fn execute(&self, arguments: Value, config: &SessionConfig) -> Result<RawToolResult>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),
}

/// Static catalog of tools: a base set that every session gets and an
/// extended set that is opt-in per session.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    base: Vec<Arc<dyn Tool>>,
    extended: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an always-available tool
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.base.push(tool);
    }

    /// Register a tool only offered when the session enables extended tools
    pub fn register_extended(&mut self, tool: Arc<dyn Tool>) {
        self.extended.push(tool);
    }

    /// Effective tool list for a session, in declaration order.
    pub fn compose(&self, include_extended: bool) -> Result<ToolSet, RegistryError> {
        let extended: &[Arc<dyn Tool>] = if include_extended { &self.extended } else { &[] };
        ToolSet::from_tools(self.base.iter().chain(extended).cloned().collect())
    }

    /// Check that the largest composition is name-unique.
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.compose(true).map(|_| ())
    }

    pub fn base_len(&self) -> usize {
        self.base.len()
    }

    pub fn extended_len(&self) -> usize {
        self.extended.len()
    }
}

/// Ordered, name-unique tools bound into one session.
#[derive(Clone)]
pub struct ToolSet {
    tools: Vec<(ToolSchema, Arc<dyn Tool>)>,
}

impl ToolSet {
    fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(tools.len());

        for tool in tools {
            let schema = tool.schema();
            if !seen.insert(schema.name.clone()) {
                return Err(RegistryError::DuplicateTool(schema.name));
            }
            entries.push((schema, tool));
        }

        Ok(Self { tools: entries })
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|(schema, _)| schema.name == name)
            .map(|(_, tool)| tool.clone())
    }

    /// List all tool schemas
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|(schema, _)| schema.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|(schema, _)| schema.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_empty() -> Value {
    json_schema_object(serde_json::json!({}), vec![])
}

pub fn json_schema_string(description: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_uri(description: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "format": "uri",
        "description": description
    })
}

pub fn json_schema_integer(description: &str, minimum: u64, default: u64) -> Value {
    serde_json::json!({
        "type": "integer",
        "minimum": minimum,
        "default": default,
        "description": description
    })
}
