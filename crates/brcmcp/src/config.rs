//! Server configuration.
//!
//! Read once at startup from a JSON file; every field has a default
//! matching the public BV-BRC deployment, so an empty `{}` config is a
//! working config. `PORT` in the environment overrides the configured
//! listen port.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Solr data API root.
    pub base_url: String,
    /// Workspace JSON-RPC endpoint.
    pub workspace_url: String,
    /// App-service JSON-RPC endpoint.
    pub service_api_url: String,
    /// Identity-provider authentication endpoint.
    pub authentication_url: String,
    /// Public base URL announced in the OIDC discovery document.
    pub openid_config_url: String,
    /// HTTP listen host.
    pub host: String,
    /// HTTP listen port; the `PORT` environment variable wins.
    pub port: u16,
    /// Directory of per-service parameter documentation files.
    pub service_info_dir: String,
    /// Last-resort credential (tier 4 of the resolution chain).
    pub token: Option<String>,
    /// Server-wide redirect allow-list; empty defers to each client's
    /// registered URIs.
    pub allowed_redirect_uris: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://www.bv-brc.org/api-bulk".to_string(),
            workspace_url: "https://p3.theseed.org/services/Workspace".to_string(),
            service_api_url: "https://p3.theseed.org/services/app_service".to_string(),
            authentication_url: "https://user.patricbrc.org/authenticate".to_string(),
            openid_config_url: "https://dev-7.bv-brc.org".to_string(),
            host: "127.0.0.1".to_string(),
            port: 12010,
            service_info_dir: "service_info".to_string(),
            token: None,
            allowed_redirect_uris: Vec::new(),
        }
    }
}

impl Config {
    /// Load from a JSON file, or fall back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(port) = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
        {
            self.port = port;
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
