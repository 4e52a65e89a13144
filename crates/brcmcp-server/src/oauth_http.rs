//! OAuth2 front-door HTTP endpoints.
//!
//! Routes: dynamic registration, the authorize/login hop that fronts the
//! BV-BRC identity provider, the token exchange, and OIDC discovery.
//! Protocol logic lives in `brcmcp_auth::oauth`; this module only maps
//! HTTP to it.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use brcmcp_api::ApiError;
use brcmcp_auth::{ClientRegistration, InMemoryOAuthStore, OAuthError, OAuthService, TokenRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for the OAuth routes.
#[derive(Clone)]
pub struct OAuthState {
    pub service: Arc<OAuthService<InMemoryOAuthStore>>,
    pub http: reqwest::Client,
    /// Identity-provider endpoint that takes the username/password form.
    pub authentication_url: String,
    /// Public base URL of this server, used in the discovery document.
    pub issuer: String,
}

pub fn router(state: OAuthState) -> Router {
    Router::new()
        .route(
            "/.well-known/openid-configuration",
            get(openid_configuration),
        )
        .route("/oauth2/register", post(register))
        .route("/oauth2/authorize", get(authorize))
        .route("/oauth2/login", post(login))
        .route("/oauth2/token", post(token))
        .with_state(state)
}

fn oauth_error(err: &OAuthError) -> Response {
    let status =
        StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({
        "error": err.error_code(),
        "error_description": err.to_string(),
    });
    (status, Json(body)).into_response()
}

async fn openid_configuration(State(state): State<OAuthState>) -> Json<Value> {
    let issuer = state.issuer.trim_end_matches('/');
    Json(json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/oauth2/authorize"),
        "token_endpoint": format!("{issuer}/oauth2/token"),
        "registration_endpoint": format!("{issuer}/oauth2/register"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code"],
        "code_challenge_methods_supported": ["S256"],
        "token_endpoint_auth_methods_supported": ["none", "client_secret_post"],
        "scopes_supported": ["mcp"],
        "subject_types_supported": ["public"],
    }))
}

async fn register(State(state): State<OAuthState>, body: Json<Value>) -> Response {
    let registration: ClientRegistration = match serde_json::from_value(body.0) {
        Ok(registration) => registration,
        Err(_) => return oauth_error(&OAuthError::InvalidClientMetadata),
    };
    match state.service.register(registration).await {
        Ok(client) => (StatusCode::CREATED, Json(client)).into_response(),
        Err(err) => oauth_error(&err),
    }
}

#[derive(Debug, Deserialize)]
struct AuthorizeQuery {
    client_id: Option<String>,
    redirect_uri: Option<String>,
    response_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    code_challenge: Option<String>,
    #[serde(default)]
    code_challenge_method: Option<String>,
}

async fn authorize(
    State(state): State<OAuthState>,
    Query(query): Query<AuthorizeQuery>,
) -> Response {
    let Some(client_id) = query.client_id.as_deref() else {
        return oauth_error(&OAuthError::InvalidRequest(
            "client_id is required".to_string(),
        ));
    };
    let Some(redirect_uri) = query.redirect_uri.as_deref() else {
        return oauth_error(&OAuthError::InvalidRequest(
            "redirect_uri is required".to_string(),
        ));
    };
    let response_type = query.response_type.as_deref().unwrap_or("");

    if let Err(err) = state
        .service
        .validate_authorize(client_id, redirect_uri, response_type)
        .await
    {
        return oauth_error(&err);
    }

    Html(login_page(&query)).into_response()
}

/// The login form carries the pending authorization parameters as
/// hidden fields, so the POST to `/oauth2/login` can complete the flow.
fn login_page(query: &AuthorizeQuery) -> String {
    let hidden = |name: &str, value: &Option<String>| match value {
        Some(value) => format!(
            r#"<input type="hidden" name="{name}" value="{}">"#,
            escape_html(value)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>BV-BRC Login</title></head>
<body>
  <h1>Sign in to BV-BRC</h1>
  <form method="post" action="/oauth2/login">
    {client_id}
    {redirect_uri}
    {state}
    {scope}
    {code_challenge}
    {code_challenge_method}
    <label>Username <input type="text" name="username" autofocus></label>
    <label>Password <input type="password" name="password"></label>
    <button type="submit">Sign in</button>
  </form>
</body>
</html>"#,
        client_id = hidden("client_id", &query.client_id),
        redirect_uri = hidden("redirect_uri", &query.redirect_uri),
        state = hidden("state", &query.state),
        scope = hidden("scope", &query.scope),
        code_challenge = hidden("code_challenge", &query.code_challenge),
        code_challenge_method = hidden("code_challenge_method", &query.code_challenge_method),
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: Option<String>,
    password: Option<String>,
    client_id: Option<String>,
    redirect_uri: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    code_challenge: Option<String>,
}

async fn login(State(state): State<OAuthState>, Form(form): Form<LoginForm>) -> Response {
    let (Some(username), Some(password)) = (form.username.as_deref(), form.password.as_deref())
    else {
        return oauth_error(&OAuthError::InvalidRequest(
            "username and password are required".to_string(),
        ));
    };
    if username.is_empty() || password.is_empty() {
        return oauth_error(&OAuthError::InvalidRequest(
            "username and password are required".to_string(),
        ));
    }
    let (Some(client_id), Some(redirect_uri)) =
        (form.client_id.as_deref(), form.redirect_uri.as_deref())
    else {
        return oauth_error(&OAuthError::InvalidRequest(
            "client_id and redirect_uri are required".to_string(),
        ));
    };

    // Re-validate: the hidden fields are client-controlled.
    if let Err(err) = state
        .service
        .validate_authorize(client_id, redirect_uri, "code")
        .await
    {
        return oauth_error(&err);
    }

    let user_token = match brcmcp_api::identity::authenticate(
        &state.http,
        &state.authentication_url,
        username,
        password,
    )
    .await
    {
        Ok(token) => token,
        Err(ApiError::Rejected { .. }) => {
            warn!(username, "login rejected by identity provider");
            return oauth_error(&OAuthError::AccessDenied);
        }
        Err(ApiError::Unreachable(_)) => {
            return oauth_error(&OAuthError::UpstreamUnavailable);
        }
        Err(err) => {
            return oauth_error(&OAuthError::ServerError(err.to_string()));
        }
    };

    let code = state
        .service
        .issue_code(
            client_id,
            redirect_uri,
            form.code_challenge.clone(),
            username,
            user_token,
            form.scope.clone().unwrap_or_default(),
        )
        .await;

    let mut location = format!("{redirect_uri}?code={}", urlencoding::encode(&code));
    if let Some(csrf_state) = &form.state {
        location.push_str("&state=");
        location.push_str(&urlencoding::encode(csrf_state));
    }

    info!(client_id, username, "login succeeded, redirecting");
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

async fn token(State(state): State<OAuthState>, Form(request): Form<TokenRequest>) -> Response {
    match state.service.exchange(request).await {
        Ok(grant) => Json(grant).into_response(),
        Err(err) => oauth_error(&err),
    }
}
