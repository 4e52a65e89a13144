//! Health check tool.

use crate::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

/// Reports server liveness. Requires no credential.
pub struct HealthCheckTool;

#[async_trait]
impl Tool for HealthCheckTool {
    fn id(&self) -> &str {
        "health_check"
    }

    fn description(&self) -> &str {
        "Check that the BV-BRC MCP server is running and responsive"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value, _ctx: &ToolContext) -> ToolResult<String> {
        let status = json!({
            "status": "ok",
            "service": "brcmcp",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        });
        Ok(status.to_string())
    }
}
