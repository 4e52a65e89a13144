//! Workspace tools: listing, search, metadata, file transfer.

use crate::{Tool, ToolContext, ToolError, ToolResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use brcmcp_api::{transfer, RpcClient};
use brcmcp_auth::Credential;
use serde_json::{json, Value};
use std::path::Path;

/// The user's workspace home folder.
fn home_path(credential: &Credential) -> ToolResult<String> {
    let user = credential
        .user_id()
        .ok_or_else(|| ToolError::execution_failed("cannot derive user id from credential"))?;
    Ok(format!("/{user}/home"))
}

/// Absolute paths pass through; relative ones land under the home folder.
fn resolve_paths(paths: Vec<String>, credential: &Credential) -> ToolResult<Vec<String>> {
    let home = home_path(credential)?;
    Ok(paths
        .into_iter()
        .map(|p| {
            if p.starts_with('/') {
                p
            } else {
                format!("{home}/{p}")
            }
        })
        .collect())
}

const GENOME_GROUP_FOLDER: &str = "Genome Groups";
const FEATURE_GROUP_FOLDER: &str = "Feature Groups";

/// Resolve a group location from its name or an explicit path, exactly
/// one of which must be given. Named groups live under the type's folder
/// in the home directory; relative paths resolve under home.
fn group_path(
    args: &Value,
    name_field: &str,
    path_field: &str,
    folder: &str,
    credential: &Credential,
) -> ToolResult<String> {
    let name = args.get(name_field).and_then(Value::as_str);
    let path = args.get(path_field).and_then(Value::as_str);
    match (name, path) {
        (Some(_), Some(_)) => Err(ToolError::validation(format!(
            "only one of {name_field} or {path_field} may be given"
        ))),
        (None, None) => Err(ToolError::validation(format!(
            "one of {name_field} or {path_field} is required"
        ))),
        (None, Some(p)) if p.starts_with('/') => Ok(p.to_string()),
        (None, Some(p)) => Ok(format!("{}/{p}", home_path(credential)?)),
        (Some(n), None) => Ok(format!("{}/{folder}/{n}", home_path(credential)?)),
    }
}

fn comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Feature ids end in a dot followed by a three-digit ordinal; callers
/// often omit that dot, so restore it when the suffix looks undotted.
fn normalize_feature_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() >= 4 && chars[chars.len() - 4] != '.' {
        let split = chars.len() - 3;
        let head: String = chars[..split].iter().collect();
        let tail: String = chars[split..].iter().collect();
        format!("{head}.{tail}")
    } else {
        id.to_string()
    }
}

/// Read a group object's stored id list from the workspace.
async fn group_id_list(
    rpc: &RpcClient,
    path: &str,
    id_field: &str,
    token: &str,
) -> ToolResult<Value> {
    let result = rpc
        .call(
            "Workspace.get",
            json!({"objects": [path], "metadata_only": false}),
            Some(token),
        )
        .await?;
    // Each object comes back as a [metadata, content] pair.
    let content = result
        .get(0)
        .and_then(|v| v.get(0))
        .and_then(|pair| pair.get(1))
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::execution_failed("group object has no content"))?;
    let content: Value = serde_json::from_str(content)
        .map_err(|_| ToolError::execution_failed("group content is not valid JSON"))?;
    content
        .get("id_list")
        .and_then(|l| l.get(id_field))
        .cloned()
        .ok_or_else(|| ToolError::execution_failed(format!("group content has no {id_field} list")))
}

fn string_array(args: &Value, field: &str) -> Vec<String> {
    args.get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// List workspace folder contents.
pub struct WorkspaceLsTool {
    rpc: RpcClient,
}

impl WorkspaceLsTool {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl Tool for WorkspaceLsTool {
    fn id(&self) -> &str {
        "workspace_ls"
    }

    fn description(&self) -> &str {
        "List the contents of BV-BRC workspace folders"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "description": "Workspace paths to list; relative paths resolve under /<user>/home; defaults to the home folder"
                },
                "token": {"type": "string", "description": "BV-BRC auth token"}
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let credential = ctx.credential_with(&args)?;
        let mut paths = string_array(&args, "paths");
        if paths.is_empty() {
            paths.push(home_path(&credential)?);
        }
        let paths = resolve_paths(paths, &credential)?;

        let result = self
            .rpc
            .call(
                "Workspace.ls",
                json!({
                    "Recursive": false,
                    "includeSubDirs": false,
                    "paths": paths,
                }),
                Some(credential.secret()),
            )
            .await?;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

/// Search workspace object names recursively.
pub struct WorkspaceSearchTool {
    rpc: RpcClient,
}

impl WorkspaceSearchTool {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

/// Build the name query: case-insensitive regexes for the term and/or
/// the extension, joined with `$and` when both are present.
fn search_query(search_term: Option<&str>, file_extension: Option<&str>) -> Value {
    let mut conditions = Vec::new();
    if let Some(term) = search_term {
        conditions.push(json!({"name": {"$regex": term, "$options": "i"}}));
    }
    if let Some(ext) = file_extension {
        let ext = ext.trim_start_matches('.');
        conditions.push(json!({"name": {"$regex": format!("\\.{ext}$"), "$options": "i"}}));
    }
    if conditions.len() == 1 {
        conditions.remove(0)
    } else {
        json!({"$and": conditions})
    }
}

#[async_trait]
impl Tool for WorkspaceSearchTool {
    fn id(&self) -> &str {
        "workspace_search"
    }

    fn description(&self) -> &str {
        "Search the BV-BRC workspace by file name and/or extension"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "description": "Workspace paths to search; defaults to /<user>/home"
                },
                "search_term": {
                    "type": "string",
                    "description": "Case-insensitive term matched against object names"
                },
                "file_extension": {
                    "type": "string",
                    "description": "Filter by extension, with or without the leading dot"
                },
                "token": {"type": "string", "description": "BV-BRC auth token"}
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let search_term = args.get("search_term").and_then(Value::as_str);
        let file_extension = args.get("file_extension").and_then(Value::as_str);
        if search_term.is_none() && file_extension.is_none() {
            return Err(ToolError::validation(
                "at least one of search_term or file_extension is required",
            ));
        }

        let credential = ctx.credential_with(&args)?;
        let mut paths = string_array(&args, "paths");
        if paths.is_empty() {
            paths.push(home_path(&credential)?);
        }
        let paths = resolve_paths(paths, &credential)?;

        let result = self
            .rpc
            .call(
                "Workspace.ls",
                json!({
                    "recursive": true,
                    "excludeDirectories": false,
                    "excludeObjects": false,
                    "includeSubDirs": true,
                    "paths": paths,
                    "query": search_query(search_term, file_extension),
                }),
                Some(credential.secret()),
            )
            .await?;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

/// Fetch object metadata without the content.
pub struct WorkspaceMetadataTool {
    rpc: RpcClient,
}

impl WorkspaceMetadataTool {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl Tool for WorkspaceMetadataTool {
    fn id(&self) -> &str {
        "workspace_get_file_metadata"
    }

    fn description(&self) -> &str {
        "Get the metadata of a BV-BRC workspace object without its content"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Workspace path of the object"},
                "token": {"type": "string", "description": "BV-BRC auth token"}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let credential = ctx.credential_with(&args)?;
        let path = args["path"].as_str().unwrap_or_default();
        let result = self
            .rpc
            .call(
                "Workspace.get",
                json!({"objects": [path], "metadata_only": true}),
                Some(credential.secret()),
            )
            .await?;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

/// Download a workspace file's contents.
pub struct WorkspaceDownloadTool {
    rpc: RpcClient,
    http: reqwest::Client,
}

impl WorkspaceDownloadTool {
    pub fn new(rpc: RpcClient, http: reqwest::Client) -> Self {
        Self { rpc, http }
    }
}

#[async_trait]
impl Tool for WorkspaceDownloadTool {
    fn id(&self) -> &str {
        "workspace_download_file"
    }

    fn description(&self) -> &str {
        "Download a BV-BRC workspace file; text is returned verbatim, \
         binary content base64-encoded"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Workspace path of the file"},
                "token": {"type": "string", "description": "BV-BRC auth token"}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let credential = ctx.credential_with(&args)?;
        let path = args["path"].as_str().unwrap_or_default();

        let result = self
            .rpc
            .call(
                "Workspace.get_download_url",
                json!({"objects": [path]}),
                Some(credential.secret()),
            )
            .await?;
        let url = result
            .get(0)
            .and_then(|v| v.get(0))
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::execution_failed("no download URL returned"))?;

        let bytes = transfer::download(&self.http, url, credential.secret()).await?;
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(err) => {
                let encoded = STANDARD.encode(err.as_bytes());
                Ok(format!(
                    "<base64_encoded_data>{encoded}</base64_encoded_data>"
                ))
            }
        }
    }
}

/// Upload a local file into the workspace.
pub struct WorkspaceUploadTool {
    rpc: RpcClient,
    http: reqwest::Client,
}

impl WorkspaceUploadTool {
    pub fn new(rpc: RpcClient, http: reqwest::Client) -> Self {
        Self { rpc, http }
    }
}

#[async_trait]
impl Tool for WorkspaceUploadTool {
    fn id(&self) -> &str {
        "workspace_upload"
    }

    fn description(&self) -> &str {
        "Upload a local file into the BV-BRC workspace"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "local_path": {
                    "type": "string",
                    "description": "Path of the local file to upload"
                },
                "upload_dir": {
                    "type": "string",
                    "description": "Workspace folder to upload into (defaults to /<user>/home)"
                },
                "token": {"type": "string", "description": "BV-BRC auth token"}
            },
            "required": ["local_path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let credential = ctx.credential_with(&args)?;
        let local_path = args["local_path"].as_str().unwrap_or_default();
        let file_name = Path::new(local_path)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ToolError::validation("local_path has no file name"))?
            .to_string();

        let content = tokio::fs::read(local_path).await?;

        let upload_dir = match args.get("upload_dir").and_then(Value::as_str) {
            Some(dir) => dir.to_string(),
            None => home_path(&credential)?,
        };
        let dest = format!("{}/{}", upload_dir.trim_end_matches('/'), file_name);

        // Workspace.create object tuple: path, type, user metadata, content
        let result = self
            .rpc
            .call(
                "Workspace.create",
                json!({
                    "objects": [[dest, "unspecified", {}, ""]],
                    "createUploadNodes": true,
                    "overwrite": null,
                }),
                Some(credential.secret()),
            )
            .await?;

        // Metadata tuple index 11 is the upload node URL.
        let upload_url = result
            .get(0)
            .and_then(|v| v.get(0))
            .and_then(|meta| meta.get(11))
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::execution_failed("no upload node URL returned"))?;

        transfer::upload(
            &self.http,
            upload_url,
            credential.secret(),
            &file_name,
            content,
        )
        .await?;

        let message = json!({
            "file": file_name,
            "uploadDirectory": upload_dir,
            "path": dest,
            "upload_status": "success",
        });
        Ok(serde_json::to_string_pretty(&message)?)
    }
}

/// Create a genome group object in the workspace.
pub struct CreateGenomeGroupTool {
    rpc: RpcClient,
}

impl CreateGenomeGroupTool {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl Tool for CreateGenomeGroupTool {
    fn id(&self) -> &str {
        "create_genome_group"
    }

    fn description(&self) -> &str {
        "Create a genome group in the BV-BRC workspace from a list of genome ids"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "genome_group_name": {
                    "type": "string",
                    "description": "Group name; the group lands under /<user>/home/Genome Groups"
                },
                "genome_group_path": {
                    "type": "string",
                    "description": "Explicit workspace path for the group, instead of a name"
                },
                "genome_id_list": {
                    "type": "string",
                    "description": "Comma-separated genome ids, e.g. '83333.111,83333.112'"
                },
                "token": {"type": "string", "description": "BV-BRC auth token"}
            },
            "required": ["genome_id_list"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let credential = ctx.credential_with(&args)?;
        let path = group_path(
            &args,
            "genome_group_name",
            "genome_group_path",
            GENOME_GROUP_FOLDER,
            &credential,
        )?;
        let ids = comma_list(args["genome_id_list"].as_str().unwrap_or_default());
        if ids.is_empty() {
            return Err(ToolError::validation("genome_id_list must not be empty"));
        }

        let name = path.rsplit('/').next().unwrap_or_default();
        let content = json!({"id_list": {"genome_id": ids}, "name": name});
        let result = self
            .rpc
            .call(
                "Workspace.create",
                json!({"objects": [[path, "genome_group", {}, content]]}),
                Some(credential.secret()),
            )
            .await?;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

/// Create a feature group object in the workspace.
pub struct CreateFeatureGroupTool {
    rpc: RpcClient,
}

impl CreateFeatureGroupTool {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl Tool for CreateFeatureGroupTool {
    fn id(&self) -> &str {
        "create_feature_group"
    }

    fn description(&self) -> &str {
        "Create a feature group in the BV-BRC workspace from a list of feature ids"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "feature_group_name": {
                    "type": "string",
                    "description": "Group name; the group lands under /<user>/home/Feature Groups"
                },
                "feature_group_path": {
                    "type": "string",
                    "description": "Explicit workspace path for the group, instead of a name"
                },
                "feature_id_list": {
                    "type": "string",
                    "description": "Comma-separated feature ids, e.g. 'fig|83333.111.peg.123'"
                },
                "token": {"type": "string", "description": "BV-BRC auth token"}
            },
            "required": ["feature_id_list"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let credential = ctx.credential_with(&args)?;
        let path = group_path(
            &args,
            "feature_group_name",
            "feature_group_path",
            FEATURE_GROUP_FOLDER,
            &credential,
        )?;
        let ids: Vec<String> = comma_list(args["feature_id_list"].as_str().unwrap_or_default())
            .iter()
            .map(|id| normalize_feature_id(id))
            .collect();
        if ids.is_empty() {
            return Err(ToolError::validation("feature_id_list must not be empty"));
        }

        let name = path.rsplit('/').next().unwrap_or_default();
        let content = json!({"id_list": {"feature_id": ids}, "name": name});
        let result = self
            .rpc
            .call(
                "Workspace.create",
                json!({"objects": [[path, "feature_group", {}, content]]}),
                Some(credential.secret()),
            )
            .await?;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

/// Read the genome ids stored in a genome group.
pub struct GenomeGroupIdsTool {
    rpc: RpcClient,
}

impl GenomeGroupIdsTool {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl Tool for GenomeGroupIdsTool {
    fn id(&self) -> &str {
        "get_genome_group_ids"
    }

    fn description(&self) -> &str {
        "Get the genome ids contained in a BV-BRC workspace genome group"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "genome_group_name": {
                    "type": "string",
                    "description": "Group name under /<user>/home/Genome Groups"
                },
                "genome_group_path": {
                    "type": "string",
                    "description": "Explicit workspace path of the group, instead of a name"
                },
                "token": {"type": "string", "description": "BV-BRC auth token"}
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let credential = ctx.credential_with(&args)?;
        let path = group_path(
            &args,
            "genome_group_name",
            "genome_group_path",
            GENOME_GROUP_FOLDER,
            &credential,
        )?;
        let ids = group_id_list(&self.rpc, &path, "genome_id", credential.secret()).await?;
        Ok(serde_json::to_string_pretty(&ids)?)
    }
}

/// Read the feature ids stored in a feature group.
pub struct FeatureGroupIdsTool {
    rpc: RpcClient,
}

impl FeatureGroupIdsTool {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl Tool for FeatureGroupIdsTool {
    fn id(&self) -> &str {
        "get_feature_group_ids"
    }

    fn description(&self) -> &str {
        "Get the feature ids contained in a BV-BRC workspace feature group"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "feature_group_name": {
                    "type": "string",
                    "description": "Group name under /<user>/home/Feature Groups"
                },
                "feature_group_path": {
                    "type": "string",
                    "description": "Explicit workspace path of the group, instead of a name"
                },
                "token": {"type": "string", "description": "BV-BRC auth token"}
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let credential = ctx.credential_with(&args)?;
        let path = group_path(
            &args,
            "feature_group_name",
            "feature_group_path",
            FEATURE_GROUP_FOLDER,
            &credential,
        )?;
        let ids = group_id_list(&self.rpc, &path, "feature_id", credential.secret()).await?;
        Ok(serde_json::to_string_pretty(&ids)?)
    }
}
