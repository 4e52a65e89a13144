//! JSON-RPC caller for the workspace and app-service APIs.
//!
//! The BV-BRC service APIs speak JSON-RPC 2.0 over POST with the
//! `application/jsonrpc+json` content type and expect the raw signed token
//! (no `Bearer` prefix) in the `Authorization` header.

use crate::error::{ApiError, ApiResult};
use rand::Rng;
use serde_json::{json, Value};
use tracing::debug;

/// A client for one JSON-RPC service endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    service_url: String,
}

impl RpcClient {
    /// Create a caller for the given service URL.
    pub fn new(client: reqwest::Client, service_url: impl Into<String>) -> Self {
        let service_url = service_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            service_url,
        }
    }

    /// The service URL this client talks to.
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Issue a JSON-RPC call and return the `result` member.
    ///
    /// A JSON-RPC `error` member or a non-2xx status maps to
    /// [`ApiError::Rejected`] with the remote message carried verbatim.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        token: Option<&str>,
    ) -> ApiResult<Value> {
        let id: u64 = rand::thread_rng().gen_range(1..1_000_000_000);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, url = %self.service_url, "JSON-RPC call");

        let mut request = self
            .client
            .post(&self.service_url)
            .header("Content-Type", "application/jsonrpc+json")
            .body(payload.to_string());
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }

        let response = request.send().await.map_err(ApiError::from_transport)?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(ApiError::from_transport)?;

        if !status.is_success() {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: truncate(&body),
            });
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::MalformedResponse(format!("invalid JSON: {e}")))?;

        if let Some(error) = parsed.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(parsed.get("result").cloned().unwrap_or(Value::Null))
    }
}

/// Bound error bodies carried into messages.
fn truncate(body: &str) -> String {
    const MAX: usize = 512;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> reqwest::Client {
        crate::http_client(std::time::Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_call_returns_result_member() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("Content-Type", "application/jsonrpc+json"))
            .and(body_partial_json(json!({"method": "AppService.enumerate_apps"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0", "id": 1, "result": [["Date"], ["GenomeAssembly"]]
                })),
            )
            .mount(&server)
            .await;

        let rpc = RpcClient::new(client(), server.uri());
        let result = rpc
            .call("AppService.enumerate_apps", json!({}), None)
            .await
            .unwrap();
        assert_eq!(result[0][0], "Date");
    }

    #[tokio::test]
    async fn test_token_sent_as_raw_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "un=alice|sig=abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let rpc = RpcClient::new(client(), server.uri());
        rpc.call("Workspace.ls", json!({}), Some("un=alice|sig=abc"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rpc_error_member_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": -32000, "message": "no such workspace"}
            })))
            .mount(&server)
            .await;

        let rpc = RpcClient::new(client(), server.uri());
        let err = rpc.call("Workspace.ls", json!({}), None).await.unwrap_err();
        match err {
            ApiError::Rejected { message, .. } => assert_eq!(message, "no such workspace"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_is_rejected_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let rpc = RpcClient::new(client(), server.uri());
        let err = rpc.call("Workspace.ls", json!({}), None).await.unwrap_err();
        match err {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid token");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let rpc = RpcClient::new(client(), server.uri());
        let err = rpc.call("Workspace.ls", json!({}), None).await.unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {}}))
                    .set_delay(std::time::Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let fast = crate::http_client(std::time::Duration::from_millis(200)).unwrap();
        let rpc = RpcClient::new(fast, server.uri());
        let started = std::time::Instant::now();
        let err = rpc.call("Workspace.ls", json!({}), None).await.unwrap_err();
        assert!(matches!(err, ApiError::Unreachable(_)));
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn test_truncate_long_body() {
        let long = "x".repeat(2000);
        let out = truncate(&long);
        assert!(out.len() < 600);
        assert!(out.ends_with("..."));
    }
}
