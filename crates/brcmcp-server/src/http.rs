//! HTTP transport shim.
//!
//! `POST /mcp` takes one JSON-RPC envelope and returns one. The bearer
//! token from the `Authorization` header becomes the top-priority
//! credential source for the call. The OAuth2 front door is mounted on
//! the same router.

use crate::core::McpServer;
use crate::oauth_http::{self, OAuthState};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use brcmcp_auth::TokenContext;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Build the full application router.
pub fn router(server: Arc<McpServer>, oauth: OAuthState) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .with_state(server)
        .merge(oauth_http::router(oauth))
        .layer(CorsLayer::permissive())
}

/// Serve the router on the given address until the process exits.
pub async fn serve(addr: &str, server: Arc<McpServer>, oauth: OAuthState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP transport listening");
    axum::serve(listener, router(server, oauth)).await?;
    Ok(())
}

async fn handle_mcp(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(TokenContext::with_header)
        .unwrap_or_default();

    // Parse in two steps so a malformed body can still yield the id.
    let request: JsonRpcRequest = match serde_json::from_str::<Value>(&body)
        .and_then(serde_json::from_value)
    {
        Ok(request) => request,
        Err(e) => {
            let id = recover_id(&body);
            return Json(JsonRpcResponse::failure(
                id,
                PARSE_ERROR,
                format!("parse error: {e}"),
            ))
            .into_response();
        }
    };

    match server.handle_request(request, token).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Best-effort id recovery from a body that failed full parsing.
fn recover_id(body: &str) -> Option<u64> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("id")?
        .as_u64()
}
