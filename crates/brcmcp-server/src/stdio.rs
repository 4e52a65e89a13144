//! Stdio transport shim.
//!
//! Newline-delimited JSON over stdin/stdout, handled strictly in order.
//! Stdout carries only protocol envelopes; all logging goes to stderr.
//! Credentials come from the environment/config tiers, since there is
//! no per-request header channel.

use crate::core::McpServer;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use brcmcp_auth::TokenContext;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

/// Run the stdio loop until stdin reaches EOF.
pub async fn run(server: Arc<McpServer>) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match parse_request(line) {
            Ok(request) => server.handle_request(request, TokenContext::default()).await,
            Err(Some(id)) => Some(JsonRpcResponse::failure(
                Some(id),
                PARSE_ERROR,
                "parse error",
            )),
            Err(None) => {
                warn!("dropping unparseable request with no recoverable id");
                continue;
            }
        };

        if let Some(response) = response {
            let mut encoded = serde_json::to_string(&response)?;
            encoded.push('\n');
            stdout.write_all(encoded.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    debug!("stdin closed, stdio transport exiting");
    Ok(())
}

/// Parse one line. On failure, the error carries the request id when it
/// could be recovered from the raw JSON.
fn parse_request(line: &str) -> Result<JsonRpcRequest, Option<u64>> {
    let value: Value = serde_json::from_str(line).map_err(|_| None)?;
    let id = value.get("id").and_then(Value::as_u64);
    serde_json::from_value(value).map_err(|_| id)
}
