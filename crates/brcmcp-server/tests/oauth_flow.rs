//! End-to-end OAuth2 flow and HTTP transport tests against a live
//! in-process server.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use brcmcp_auth::{InMemoryOAuthStore, OAuthService, TokenProvider};
use brcmcp_server::{router, McpServer, OAuthState};
use brcmcp_tools::{HealthCheckTool, ToolRegistry};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const REDIRECT: &str = "https://client.example/callback";
const USER_TOKEN: &str = "un=alice|tokenid=1|expiry=9999999999|sig=tok";

async fn spawn_app(authentication_url: String) -> String {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(HealthCheckTool)).unwrap();
    let server = Arc::new(McpServer::new(
        Arc::new(registry),
        Arc::new(TokenProvider::new(None, None)),
    ));

    let http = brcmcp_api::http_client(std::time::Duration::from_secs(2)).unwrap();
    let oauth = OAuthState {
        service: Arc::new(OAuthService::new(InMemoryOAuthStore::new(), Vec::new())),
        http,
        authentication_url,
        issuer: "http://localhost".to_string(),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(server, oauth);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

async fn identity_provider() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{USER_TOKEN}\n")))
        .mount(&server)
        .await;
    server
}

async fn register_client(client: &reqwest::Client, base: &str) -> String {
    let response = client
        .post(format!("{base}/oauth2/register"))
        .json(&json!({
            "redirect_uris": [REDIRECT],
            "client_name": "flow test",
            "token_endpoint_auth_method": "none"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert!(body.get("client_secret").is_none());
    body["client_id"].as_str().unwrap().to_string()
}

async fn login_for_code(
    client: &reqwest::Client,
    base: &str,
    client_id: &str,
    extra: &[(&str, &str)],
) -> String {
    let mut form = vec![
        ("username", "alice"),
        ("password", "s3cret"),
        ("client_id", client_id),
        ("redirect_uri", REDIRECT),
    ];
    form.extend_from_slice(extra);
    let response = client
        .post(format!("{base}/oauth2/login"))
        .form(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 302);
    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with(REDIRECT));
    let query = location.split('?').nth(1).unwrap();
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("code="))
        .map(|c| urlencoding::decode(c).unwrap().into_owned())
        .unwrap()
}

#[tokio::test]
async fn test_full_flow_and_replay() {
    let identity = identity_provider().await;
    let base = spawn_app(identity.uri()).await;
    let client = client();

    let client_id = register_client(&client, &base).await;

    // authorize serves the login form
    let response = client
        .get(format!(
            "{base}/oauth2/authorize?client_id={client_id}&redirect_uri={}&response_type=code&state=xyz",
            urlencoding::encode(REDIRECT)
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let page = response.text().await.unwrap();
    assert!(page.contains("/oauth2/login"));
    assert!(page.contains("name=\"state\""));

    let code = login_for_code(&client, &base, &client_id, &[("state", "xyz")]).await;

    // exchange the code
    let response = client
        .post(format!("{base}/oauth2/token"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", client_id.as_str()),
            ("redirect_uri", REDIRECT),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let grant: Value = response.json().await.unwrap();
    assert_eq!(grant["access_token"], USER_TOKEN);
    assert_eq!(grant["token_type"], "Bearer");
    assert_eq!(grant["expires_in"], 3600);

    // replaying the same code fails
    let response = client
        .post(format!("{base}/oauth2/token"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", client_id.as_str()),
            ("redirect_uri", REDIRECT),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_grant");
    assert!(body["error_description"]
        .as_str()
        .unwrap()
        .contains("already used"));
}

#[tokio::test]
async fn test_redirect_variants_rejected() {
    let identity = identity_provider().await;
    let base = spawn_app(identity.uri()).await;
    let client = client();
    let client_id = register_client(&client, &base).await;

    for variant in [
        "https://client.example/callback/",
        "https://client.example/callback/extra",
        "https://client.example/call",
    ] {
        let response = client
            .get(format!(
                "{base}/oauth2/authorize?client_id={client_id}&redirect_uri={}&response_type=code",
                urlencoding::encode(variant)
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "{variant}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "invalid_request");
    }
}

#[tokio::test]
async fn test_pkce_verifier_enforced() {
    let identity = identity_provider().await;
    let base = spawn_app(identity.uri()).await;
    let client = client();
    let client_id = register_client(&client, &base).await;

    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));

    let code = login_for_code(
        &client,
        &base,
        &client_id,
        &[
            ("code_challenge", challenge.as_str()),
            ("code_challenge_method", "S256"),
        ],
    )
    .await;

    // wrong verifier fails
    let response = client
        .post(format!("{base}/oauth2/token"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", client_id.as_str()),
            ("redirect_uri", REDIRECT),
            ("code_verifier", "wrong-verifier-wrong-verifier-wrong-verifier"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // fresh code with the right verifier succeeds
    let code = login_for_code(
        &client,
        &base,
        &client_id,
        &[
            ("code_challenge", challenge.as_str()),
            ("code_challenge_method", "S256"),
        ],
    )
    .await;
    let response = client
        .post(format!("{base}/oauth2/token"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", client_id.as_str()),
            ("redirect_uri", REDIRECT),
            ("code_verifier", verifier),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_login_failures() {
    let identity = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad password"))
        .mount(&identity)
        .await;
    let base = spawn_app(identity.uri()).await;
    let client = client();
    let client_id = register_client(&client, &base).await;

    // rejected credentials
    let response = client
        .post(format!("{base}/oauth2/login"))
        .form(&[
            ("username", "alice"),
            ("password", "wrong"),
            ("client_id", client_id.as_str()),
            ("redirect_uri", REDIRECT),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "access_denied");

    // unreachable identity provider
    let dead_base = spawn_app("http://127.0.0.1:1/authenticate".to_string()).await;
    let dead_client_id = register_client(&client, &dead_base).await;
    let response = client
        .post(format!("{dead_base}/oauth2/login"))
        .form(&[
            ("username", "alice"),
            ("password", "s3cret"),
            ("client_id", dead_client_id.as_str()),
            ("redirect_uri", REDIRECT),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "server_error");
}

#[tokio::test]
async fn test_discovery_document() {
    let identity = identity_provider().await;
    let base = spawn_app(identity.uri()).await;
    let response = client()
        .get(format!("{base}/.well-known/openid-configuration"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let doc: Value = response.json().await.unwrap();
    assert_eq!(doc["response_types_supported"], json!(["code"]));
    assert_eq!(doc["grant_types_supported"], json!(["authorization_code"]));
    assert_eq!(doc["code_challenge_methods_supported"], json!(["S256"]));
    assert!(doc["authorization_endpoint"]
        .as_str()
        .unwrap()
        .ends_with("/oauth2/authorize"));
}

#[tokio::test]
async fn test_mcp_endpoint_over_http() {
    let identity = identity_provider().await;
    let base = spawn_app(identity.uri()).await;
    let client = client();

    // tools/list round trip
    let response = client
        .post(format!("{base}/mcp"))
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"]["tools"][0]["name"], "health_check");

    // notifications get no envelope
    let response = client
        .post(format!("{base}/mcp"))
        .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    // parse errors come back as -32700
    let response = client
        .post(format!("{base}/mcp"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], -32700);
}
