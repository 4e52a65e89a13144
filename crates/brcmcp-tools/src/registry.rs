//! Tool registry and dispatcher.

use crate::{BoxedTool, ToolContext, ToolError};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Registration failed because the id is already taken.
#[derive(Debug, Error)]
#[error("duplicate tool id: {0}")]
pub struct DuplicateTool(pub String);

/// Protocol-level dispatch failures, distinct from tool execution
/// failures: these mean the request itself was wrong and no handler ran.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Registry of available tools. Immutable once the server starts serving.
pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Duplicate ids abort startup.
    pub fn register(&mut self, tool: BoxedTool) -> Result<(), DuplicateTool> {
        let id = tool.id().to_string();
        if self.tools.contains_key(&id) {
            return Err(DuplicateTool(id));
        }
        self.tools.insert(id, tool);
        Ok(())
    }

    /// Get a tool by ID.
    pub fn get(&self, id: &str) -> Option<&BoxedTool> {
        self.tools.get(id)
    }

    /// All tools, sorted by id for stable listings.
    pub fn all(&self) -> Vec<&BoxedTool> {
        let mut tools: Vec<&BoxedTool> = self.tools.values().collect();
        tools.sort_by_key(|t| t.id());
        tools
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a tool call.
    ///
    /// The outer `Result` is protocol-level: unknown tool or arguments
    /// that fail schema validation, detected before the handler runs and
    /// therefore before any side effect. The inner `Result` is the
    /// handler's own outcome; the caller turns an inner `Err` into an
    /// error-kind invocation result rather than a protocol failure.
    pub async fn dispatch(
        &self,
        name: &str,
        args: Value,
        ctx: &ToolContext,
    ) -> Result<Result<String, ToolError>, DispatchError> {
        let tool = self
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        validate_args(&tool.parameters_schema(), &args)?;

        debug!(tool = name, "dispatching tool call");
        let outcome = tool.execute(args, ctx).await;
        if let Err(err) = &outcome {
            warn!(tool = name, error = %err, "tool execution failed");
        }
        Ok(outcome)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check `required` presence and primitive types against the schema.
fn validate_args(schema: &Value, args: &Value) -> Result<(), DispatchError> {
    if !args.is_object() {
        return Err(DispatchError::InvalidArguments(
            "arguments must be an object".to_string(),
        ));
    }

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if args.get(field).map_or(true, Value::is_null) {
                return Err(DispatchError::InvalidArguments(format!(
                    "missing required argument: {field}"
                )));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (field, spec) in properties {
        let Some(value) = args.get(field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let Some(expected) = spec.get("type").and_then(Value::as_str) else {
            continue;
        };
        let ok = match expected {
            "string" => value.is_string(),
            "boolean" => value.is_boolean(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        };
        if !ok {
            return Err(DispatchError::InvalidArguments(format!(
                "argument {field} must be of type {expected}"
            )));
        }
    }
    Ok(())
}
