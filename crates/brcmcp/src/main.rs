//! brcmcp - MCP tool server for the BV-BRC bioinformatics platform.

mod config;

use anyhow::Context;
use brcmcp_auth::{InMemoryOAuthStore, OAuthService, TokenProvider};
use brcmcp_server::{McpServer, OAuthState};
use brcmcp_tools::{
    CreateFeatureGroupTool, CreateGenomeGroupTool, FeatureGroupIdsTool, GenomeGroupIdsTool,
    HealthCheckTool, JobDetailsTool, ListServiceAppsTool, QueryCollectionTool, ServiceInfoTool,
    SolrCollectionsTool, SubmitDateAppTool, ToolRegistry, WorkspaceDownloadTool, WorkspaceLsTool,
    WorkspaceMetadataTool, WorkspaceSearchTool, WorkspaceUploadTool,
};
use brcmcp_util::log::LogLevel;
use clap::{Parser, Subcommand};
use config::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "brcmcp")]
#[command(author, version, about = "MCP tool server for BV-BRC", long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over HTTP with the OAuth2 front door
    Serve {
        /// Bind address, overriding host/port from the config
        #[arg(long)]
        address: Option<String>,
    },
    /// Serve MCP over stdin/stdout
    Stdio,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    brcmcp_util::log::init(cli.log_level);

    let config = Config::load(&cli.config)?;
    let provider = Arc::new(TokenProvider::from_env(config.token.clone()));
    let registry = Arc::new(build_registry(&config)?);
    info!(tools = registry.len(), "tool registry ready");

    let server = Arc::new(McpServer::new(registry, provider));

    match cli.command {
        Commands::Serve { address } => {
            let addr = address.unwrap_or_else(|| config.listen_addr());
            let oauth = OAuthState {
                service: Arc::new(OAuthService::new(
                    InMemoryOAuthStore::new(),
                    config.allowed_redirect_uris.clone(),
                )),
                http: brcmcp_api::http_client(brcmcp_api::DEFAULT_TIMEOUT)?,
                authentication_url: config.authentication_url.clone(),
                issuer: config.openid_config_url.clone(),
            };
            brcmcp_server::http::serve(&addr, server, oauth).await
        }
        Commands::Stdio => brcmcp_server::stdio::run(server).await,
    }
}

fn build_registry(config: &Config) -> anyhow::Result<ToolRegistry> {
    let http = brcmcp_api::http_client(brcmcp_api::DEFAULT_TIMEOUT)?;
    let data = brcmcp_api::DataClient::new(http.clone(), &config.base_url);
    let workspace = brcmcp_api::RpcClient::new(http.clone(), &config.workspace_url);
    let app_service = brcmcp_api::RpcClient::new(http.clone(), &config.service_api_url);

    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(HealthCheckTool))
        .context("registering tools")?;
    registry.register(Arc::new(QueryCollectionTool::new(data)))?;
    registry.register(Arc::new(SolrCollectionsTool))?;
    registry.register(Arc::new(ListServiceAppsTool::new(app_service.clone())))?;
    registry.register(Arc::new(JobDetailsTool::new(app_service.clone())))?;
    registry.register(Arc::new(SubmitDateAppTool::new(app_service)))?;
    registry.register(Arc::new(ServiceInfoTool::new(
        config.service_info_dir.clone(),
    )))?;
    registry.register(Arc::new(WorkspaceLsTool::new(workspace.clone())))?;
    registry.register(Arc::new(WorkspaceSearchTool::new(workspace.clone())))?;
    registry.register(Arc::new(WorkspaceMetadataTool::new(workspace.clone())))?;
    registry.register(Arc::new(CreateGenomeGroupTool::new(workspace.clone())))?;
    registry.register(Arc::new(CreateFeatureGroupTool::new(workspace.clone())))?;
    registry.register(Arc::new(GenomeGroupIdsTool::new(workspace.clone())))?;
    registry.register(Arc::new(FeatureGroupIdsTool::new(workspace.clone())))?;
    registry.register(Arc::new(WorkspaceDownloadTool::new(
        workspace.clone(),
        http.clone(),
    )))?;
    registry.register(Arc::new(WorkspaceUploadTool::new(workspace, http)))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_registers_all_tools() {
        let registry = build_registry(&Config::default()).unwrap();
        assert_eq!(registry.len(), 16);
        assert!(registry.get("health_check").is_some());
        assert!(registry.get("query_collection").is_some());
        assert!(registry.get("workspace_upload").is_some());
        assert!(registry.get("create_genome_group").is_some());
        assert!(registry.get("get_feature_group_ids").is_some());
        assert!(registry.get("get_service_info").is_some());
    }
}
