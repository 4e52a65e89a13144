//! App-service tools: enumerate apps, inspect jobs, submit jobs.

use crate::{Tool, ToolContext, ToolError, ToolResult};
use async_trait::async_trait;
use brcmcp_api::RpcClient;
use serde_json::{json, Value};
use std::path::PathBuf;
use uuid::Uuid;

/// Default workspace folder for job output, under the user's root.
const JOB_OUTPUT_FOLDER: &str = "CopilotDevWorkflows";

/// Enumerate the applications the app service can run.
pub struct ListServiceAppsTool {
    rpc: RpcClient,
}

impl ListServiceAppsTool {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl Tool for ListServiceAppsTool {
    fn id(&self) -> &str {
        "list_service_apps"
    }

    fn description(&self) -> &str {
        "List the analysis applications available from the BV-BRC app service"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "token": {"type": "string", "description": "BV-BRC auth token"}
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let credential = ctx.credential_with(&args)?;
        let result = self
            .rpc
            .call(
                "AppService.enumerate_apps",
                json!({}),
                Some(credential.secret()),
            )
            .await?;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

/// Look up the status of submitted jobs by task id.
pub struct JobDetailsTool {
    rpc: RpcClient,
}

impl JobDetailsTool {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl Tool for JobDetailsTool {
    fn id(&self) -> &str {
        "get_job_details"
    }

    fn description(&self) -> &str {
        "Get the status and details of submitted jobs by their task ids"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_ids": {
                    "type": "array",
                    "description": "Task ids returned by job submission"
                },
                "token": {"type": "string", "description": "BV-BRC auth token"}
            },
            "required": ["task_ids"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let credential = ctx.credential_with(&args)?;
        let task_ids = args["task_ids"].clone();
        let result = self
            .rpc
            .call(
                "AppService.query_tasks",
                json!([task_ids]),
                Some(credential.secret()),
            )
            .await?;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

/// Submit the Date application, the smallest runnable app-service job.
pub struct SubmitDateAppTool {
    rpc: RpcClient,
}

impl SubmitDateAppTool {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl Tool for SubmitDateAppTool {
    fn id(&self) -> &str {
        "submit_date_app"
    }

    fn description(&self) -> &str {
        "Submit a Date job to the BV-BRC app service; writes the current \
         date into a workspace output file"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "output_path": {
                    "type": "string",
                    "description": "Workspace folder for job output (defaults to /<user>/CopilotDevWorkflows)"
                },
                "output_file": {
                    "type": "string",
                    "description": "Output object name (defaults to Date_<uuid>)"
                },
                "token": {"type": "string", "description": "BV-BRC auth token"}
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let credential = ctx.credential_with(&args)?;
        let user = credential.user_id().ok_or_else(|| {
            ToolError::execution_failed("cannot derive user id from credential")
        })?;

        let output_path = match args.get("output_path").and_then(Value::as_str) {
            Some(path) => path.to_string(),
            None => format!("/{user}/{JOB_OUTPUT_FOLDER}"),
        };
        let output_file = match args.get("output_file").and_then(Value::as_str) {
            Some(file) => file.to_string(),
            None => format!("Date_{}", Uuid::new_v4()),
        };

        let params = json!([
            "Date",
            {"output_path": output_path, "output_file": output_file},
            {}
        ]);
        let result = self
            .rpc
            .call("AppService.start_app2", params, Some(credential.secret()))
            .await?;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

/// Serve the per-service parameter documentation shipped alongside the
/// server. Reads local files only, so no credential is needed.
pub struct ServiceInfoTool {
    info_dir: PathBuf,
}

impl ServiceInfoTool {
    pub fn new(info_dir: impl Into<PathBuf>) -> Self {
        Self {
            info_dir: info_dir.into(),
        }
    }
}

#[async_trait]
impl Tool for ServiceInfoTool {
    fn id(&self) -> &str {
        "get_service_info"
    }

    fn description(&self) -> &str {
        "Get the parameter documentation for a BV-BRC analysis service, \
         e.g. 'genome_assembly' or 'date'"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service_name": {
                    "type": "string",
                    "description": "Name of the service to describe"
                }
            },
            "required": ["service_name"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolResult<String> {
        let name = args["service_name"].as_str().unwrap_or_default();
        // Lookups must stay inside the catalog directory.
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(ToolError::validation("invalid service name"));
        }

        let path = self.info_dir.join(format!("{name}.txt"));
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ToolError::validation(
                format!("unknown service: {name}"),
            )),
            Err(e) => Err(e.into()),
        }
    }
}
