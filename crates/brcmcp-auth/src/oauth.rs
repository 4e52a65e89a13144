//! OAuth2 authorization-server state machine.
//!
//! The server fronts the BV-BRC identity provider for OAuth2 clients:
//! clients register dynamically, send users through an authorize/login
//! hop, and exchange the resulting single-use code for the user's signed
//! BV-BRC token as a bearer access token.
//!
//! State lives behind the [`OAuthStore`] trait so the backing can be
//! swapped; the provided [`InMemoryOAuthStore`] keeps everything in a
//! `tokio::sync::RwLock`-guarded map. Code consumption happens under the
//! write lock, so two concurrent exchanges of one code see exactly one
//! success.

use crate::error::OAuthError;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Authorization codes live for ten minutes.
const CODE_TTL_SECS: i64 = 600;

/// Lifetime advertised on minted bearer tokens.
const TOKEN_LIFETIME_SECS: u64 = 3600;

fn default_auth_method() -> String {
    "client_secret_post".to_string()
}

/// RFC 7591 registration request (the subset the server understands).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRegistration {
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_auth_method")]
    pub token_endpoint_auth_method: String,
}

/// A registered OAuth client, echoed back as the registration response.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredClient {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// `0` means the secret never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_expires_at: Option<i64>,
    pub client_id_issued_at: i64,
    pub redirect_uris: Vec<String>,
    pub token_endpoint_auth_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Everything bound to an authorization code at issue time.
#[derive(Debug, Clone)]
pub struct AuthCodeRecord {
    pub client_id: String,
    pub redirect_uri: String,
    pub code_challenge: Option<String>,
    pub username: String,
    pub user_token: String,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

/// Outcome of the atomic code-consumption step.
#[derive(Debug)]
pub enum CodeConsumption {
    Granted(AuthCodeRecord),
    NotFound,
    AlreadyUsed,
    Expired,
}

/// Backing storage for clients and authorization codes.
#[async_trait]
pub trait OAuthStore: Send + Sync {
    /// Store a client; returns false when the id is already taken.
    async fn insert_client(&self, client: RegisteredClient) -> bool;

    async fn client(&self, client_id: &str) -> Option<RegisteredClient>;

    async fn insert_code(&self, code: String, record: AuthCodeRecord);

    /// Atomically consume a code: a `Granted` result marks it used in the
    /// same critical section, so no second caller can see it unused.
    async fn consume_code(&self, code: &str) -> CodeConsumption;
}

#[derive(Default)]
struct StoreInner {
    clients: HashMap<String, RegisteredClient>,
    codes: HashMap<String, AuthCodeRecord>,
}

/// In-memory store; state does not survive a restart.
#[derive(Default)]
pub struct InMemoryOAuthStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryOAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OAuthStore for InMemoryOAuthStore {
    async fn insert_client(&self, client: RegisteredClient) -> bool {
        let mut inner = self.inner.write().await;
        if inner.clients.contains_key(&client.client_id) {
            return false;
        }
        inner.clients.insert(client.client_id.clone(), client);
        true
    }

    async fn client(&self, client_id: &str) -> Option<RegisteredClient> {
        self.inner.read().await.clients.get(client_id).cloned()
    }

    async fn insert_code(&self, code: String, record: AuthCodeRecord) {
        self.inner.write().await.codes.insert(code, record);
    }

    async fn consume_code(&self, code: &str) -> CodeConsumption {
        let mut inner = self.inner.write().await;
        let Some(record) = inner.codes.get_mut(code) else {
            return CodeConsumption::NotFound;
        };
        if record.used {
            return CodeConsumption::AlreadyUsed;
        }
        if record.expires_at <= Utc::now() {
            return CodeConsumption::Expired;
        }
        record.used = true;
        CodeConsumption::Granted(record.clone())
    }
}

/// Form fields of the token-endpoint request.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub code_verifier: Option<String>,
}

/// Successful token-endpoint response body.
#[derive(Debug, Clone, Serialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub scope: String,
}

/// The authorization-server logic, independent of the HTTP layer.
pub struct OAuthService<S: OAuthStore> {
    store: S,
    /// Extra server-wide redirect allow-list; empty means only the
    /// per-client registered URIs constrain redirects.
    allowed_redirect_uris: Vec<String>,
}

impl<S: OAuthStore> OAuthService<S> {
    pub fn new(store: S, allowed_redirect_uris: Vec<String>) -> Self {
        Self {
            store,
            allowed_redirect_uris,
        }
    }

    /// Dynamic client registration.
    pub async fn register(
        &self,
        registration: ClientRegistration,
    ) -> Result<RegisteredClient, OAuthError> {
        if registration.redirect_uris.is_empty() {
            return Err(OAuthError::InvalidClientMetadata);
        }

        let wants_secret = registration.token_endpoint_auth_method != "none";
        loop {
            let client = RegisteredClient {
                client_id: brcmcp_util::new_client_id(),
                client_secret: wants_secret.then(brcmcp_util::new_client_secret),
                client_secret_expires_at: wants_secret.then_some(0),
                client_id_issued_at: Utc::now().timestamp(),
                redirect_uris: registration.redirect_uris.clone(),
                token_endpoint_auth_method: registration.token_endpoint_auth_method.clone(),
                client_name: registration.client_name.clone(),
                scope: registration.scope.clone(),
            };
            let client_id = client.client_id.clone();
            if self.store.insert_client(client.clone()).await {
                info!(client_id, "registered OAuth client");
                return Ok(client);
            }
            // uuid collision: mint a fresh id, never surface this
            debug!(client_id, "client id collision, regenerating");
        }
    }

    /// Validate the query half of an authorization request. No code is
    /// issued here; success means the login form may be shown.
    pub async fn validate_authorize(
        &self,
        client_id: &str,
        redirect_uri: &str,
        response_type: &str,
    ) -> Result<(), OAuthError> {
        if response_type != "code" {
            return Err(OAuthError::UnsupportedResponseType);
        }
        let client = self
            .store
            .client(client_id)
            .await
            .ok_or(OAuthError::InvalidClient)?;
        if !self.allowed_redirect_uris.is_empty()
            && !self.allowed_redirect_uris.iter().any(|u| u == redirect_uri)
        {
            return Err(OAuthError::InvalidRedirect(
                "redirect_uri is not in the server allow-list".to_string(),
            ));
        }
        // Exact string equality; no prefix or trailing-slash normalization.
        if !client.redirect_uris.iter().any(|u| u == redirect_uri) {
            return Err(OAuthError::InvalidRedirect(
                "redirect_uri does not match registered URIs".to_string(),
            ));
        }
        Ok(())
    }

    /// Mint and store a single-use authorization code after a successful
    /// login. The caller must have validated the authorize parameters.
    pub async fn issue_code(
        &self,
        client_id: &str,
        redirect_uri: &str,
        code_challenge: Option<String>,
        username: &str,
        user_token: String,
        scope: String,
    ) -> String {
        let code = brcmcp_util::new_auth_code();
        let record = AuthCodeRecord {
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            code_challenge,
            username: username.to_string(),
            user_token,
            scope,
            expires_at: Utc::now() + Duration::seconds(CODE_TTL_SECS),
            used: false,
        };
        self.store.insert_code(code.clone(), record).await;
        info!(client_id, username, "issued authorization code");
        code
    }

    /// Exchange an authorization code for the bound user token.
    pub async fn exchange(&self, request: TokenRequest) -> Result<TokenGrant, OAuthError> {
        let grant_type = request
            .grant_type
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("grant_type is required".to_string()))?;
        if grant_type != "authorization_code" {
            return Err(OAuthError::UnsupportedGrantType);
        }
        let code = request
            .code
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("code is required".to_string()))?;
        let client_id = request
            .client_id
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("client_id is required".to_string()))?;
        let redirect_uri = request
            .redirect_uri
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("redirect_uri is required".to_string()))?;

        let client = self
            .store
            .client(client_id)
            .await
            .ok_or(OAuthError::InvalidClient)?;
        if !client.redirect_uris.iter().any(|u| u == redirect_uri) {
            return Err(OAuthError::InvalidRedirect(
                "redirect_uri does not match registered URIs".to_string(),
            ));
        }

        // Single-use gate. A failed binding check below still burns the
        // code, which is the strict reading of single-use.
        let record = match self.store.consume_code(code).await {
            CodeConsumption::Granted(record) => record,
            CodeConsumption::NotFound => return Err(OAuthError::CodeNotFound),
            CodeConsumption::AlreadyUsed => return Err(OAuthError::CodeAlreadyUsed),
            CodeConsumption::Expired => return Err(OAuthError::CodeExpired),
        };

        if record.client_id != client_id {
            return Err(OAuthError::InvalidGrant("client ID mismatch".to_string()));
        }
        if record.redirect_uri != redirect_uri {
            return Err(OAuthError::InvalidGrant(
                "redirect URI mismatch".to_string(),
            ));
        }
        if let Some(challenge) = &record.code_challenge {
            let verifier = request.code_verifier.as_deref().ok_or_else(|| {
                OAuthError::InvalidGrant("code_verifier is required for PKCE".to_string())
            })?;
            if !pkce_s256_matches(verifier, challenge) {
                return Err(OAuthError::InvalidGrant(
                    "code verifier validation failed".to_string(),
                ));
            }
        }

        info!(client_id, username = %record.username, "token exchange succeeded");
        Ok(TokenGrant {
            access_token: record.user_token,
            token_type: "Bearer".to_string(),
            expires_in: TOKEN_LIFETIME_SECS,
            scope: record.scope,
        })
    }
}

/// S256: `base64url(sha256(verifier))` without padding.
fn pkce_s256_matches(verifier: &str, challenge: &str) -> bool {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest) == challenge
}
