//! Credential resolution from an ordered chain of sources.
//!
//! Callers can supply a BV-BRC token four ways, and the precedence is
//! fixed: `Authorization` header, then an explicit tool argument, then
//! the `KB_AUTH_TOKEN` environment variable captured at startup, then
//! the config file. The first usable source wins; an expired token in a
//! higher tier is skipped, never reused.

use crate::error::AuthError;
use chrono::{DateTime, TimeZone, Utc};
use tracing::warn;

/// An opaque BV-BRC credential.
///
/// The raw token is a `|`-separated signed string such as
/// `un=alice|tokenid=...|expiry=1735689600|...|sig=...`. Only two fields
/// are ever inspected; the raw value is reachable solely through
/// [`Credential::secret`] and is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for `Authorization` headers on outbound calls.
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// The user id from the leading `un=` segment, if present.
    pub fn user_id(&self) -> Option<&str> {
        self.0
            .split('|')
            .find_map(|segment| segment.strip_prefix("un="))
            .filter(|user| !user.is_empty())
    }

    /// The expiry instant from the `expiry=` segment, if present.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let seconds: i64 = self
            .0
            .split('|')
            .find_map(|segment| segment.strip_prefix("expiry="))?
            .parse()
            .ok()?;
        Utc.timestamp_opt(seconds, 0).single()
    }

    /// Whether the token's own expiry segment has passed. Tokens without
    /// an expiry segment are treated as live; the upstream services make
    /// the final call.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expiry) => expiry <= now,
            None => false,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.user_id() {
            Some(user) => write!(f, "Credential(un={user}, ...)"),
            None => write!(f, "Credential(...)"),
        }
    }
}

/// Per-invocation credential sources, captured by the transport.
#[derive(Debug, Clone, Default)]
pub struct TokenContext {
    /// Raw `Authorization` header value, when the transport saw one.
    pub bearer_header: Option<String>,
    /// Explicit `token` argument from the tool call, when given.
    pub argument: Option<String>,
}

impl TokenContext {
    pub fn with_header(header: impl Into<String>) -> Self {
        Self {
            bearer_header: Some(header.into()),
            argument: None,
        }
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }
}

/// Process-lifetime credential sources plus the resolution chain.
///
/// The provider is read-only over its sources; the environment is read
/// once at construction and never re-read.
#[derive(Debug, Clone, Default)]
pub struct TokenProvider {
    env_token: Option<String>,
    config_token: Option<String>,
}

impl TokenProvider {
    pub fn new(env_token: Option<String>, config_token: Option<String>) -> Self {
        Self {
            env_token,
            config_token,
        }
    }

    /// Capture `KB_AUTH_TOKEN` from the environment at startup.
    pub fn from_env(config_token: Option<String>) -> Self {
        let env_token = std::env::var("KB_AUTH_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self::new(env_token, config_token)
    }

    /// Resolve a credential: header > argument > environment > config.
    pub fn resolve(&self, ctx: &TokenContext) -> Result<Credential, AuthError> {
        let now = Utc::now();
        let sources = [
            ("header", ctx.bearer_header.as_deref().map(strip_bearer)),
            ("argument", ctx.argument.as_deref()),
            ("environment", self.env_token.as_deref()),
            ("config", self.config_token.as_deref()),
        ];

        let mut tried = Vec::new();
        for (name, value) in sources {
            let Some(raw) = value.map(str::trim).filter(|t| !t.is_empty()) else {
                tried.push(format!("{name}: not provided"));
                continue;
            };
            let credential = Credential::new(raw);
            if credential.is_expired(now) {
                warn!(source = name, "skipping expired credential");
                tried.push(format!("{name}: expired"));
                continue;
            }
            return Ok(credential);
        }

        Err(AuthError::NoCredential(tried.join("; ")))
    }
}

/// Strip a case-insensitive `Bearer ` prefix; plain tokens pass through.
fn strip_bearer(header: &str) -> &str {
    let trimmed = header.trim();
    match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => trimmed[7..].trim_start(),
        _ => trimmed,
    }
}
