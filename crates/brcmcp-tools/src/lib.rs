//! Tool implementations for the BV-BRC MCP server.
//!
//! This crate provides the tools an MCP client can invoke against the
//! BV-BRC data, app-service, and workspace APIs, plus the registry that
//! dispatches calls to them.

pub mod error;
pub mod registry;

// Tool implementations
pub mod data;
pub mod health;
pub mod service;
pub mod workspace;

pub use data::{QueryCollectionTool, SolrCollectionsTool};
pub use error::{ToolError, ToolResult};
pub use health::HealthCheckTool;
pub use registry::{DispatchError, DuplicateTool, ToolRegistry};
pub use service::{JobDetailsTool, ListServiceAppsTool, ServiceInfoTool, SubmitDateAppTool};
pub use workspace::{
    CreateFeatureGroupTool, CreateGenomeGroupTool, FeatureGroupIdsTool, GenomeGroupIdsTool,
    WorkspaceDownloadTool, WorkspaceLsTool, WorkspaceMetadataTool, WorkspaceSearchTool,
    WorkspaceUploadTool,
};

use async_trait::async_trait;
use brcmcp_auth::{Credential, TokenContext, TokenProvider};
use serde_json::Value;
use std::sync::Arc;

/// Context provided to tools during execution.
///
/// Credential resolution is lazy: a tool that never asks for a
/// credential (the health check) runs fine with none available.
#[derive(Clone)]
pub struct ToolContext {
    /// Per-invocation credential sources from the transport.
    pub token: TokenContext,
    provider: Arc<TokenProvider>,
}

impl ToolContext {
    pub fn new(token: TokenContext, provider: Arc<TokenProvider>) -> Self {
        Self { token, provider }
    }

    /// Resolve the caller credential from the transport context.
    pub fn credential(&self) -> ToolResult<Credential> {
        Ok(self.provider.resolve(&self.token)?)
    }

    /// Resolve the caller credential, letting a `token` argument from the
    /// tool call fill the argument tier when the transport supplied none.
    pub fn credential_with(&self, args: &Value) -> ToolResult<Credential> {
        let mut ctx = self.token.clone();
        if ctx.argument.is_none() {
            if let Some(token) = args.get("token").and_then(Value::as_str) {
                ctx.argument = Some(token.to_string());
            }
        }
        Ok(self.provider.resolve(&ctx)?)
    }
}

/// The main trait for tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool ID.
    fn id(&self) -> &str;

    /// Get the tool description (for the client).
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String>;
}

/// A boxed tool for dynamic dispatch.
pub type BoxedTool = Arc<dyn Tool>;
