//! Error types for credential resolution and the OAuth2 front door.

use thiserror::Error;

/// Failure to resolve a caller credential.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No source in the chain yielded a usable credential. The message
    /// names each source tried and why it failed; token values never
    /// appear here.
    #[error("no credential available: {0}")]
    NoCredential(String),
}

/// OAuth2 protocol failures, one variant per distinguishable outcome.
///
/// `error_code()` maps each variant onto the standard OAuth error
/// vocabulary so the HTTP layer can build RFC 6749 error bodies, and
/// `status()` gives the HTTP status the original deployment uses.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("redirect_uris is required and must not be empty")]
    InvalidClientMetadata,

    /// The redirect_uri is not an exact match for any acceptable URI.
    #[error("{0}")]
    InvalidRedirect(String),

    #[error("client not found")]
    InvalidClient,

    #[error("{0}")]
    InvalidGrant(String),

    #[error("authorization code not found or invalid")]
    CodeNotFound,

    #[error("authorization code already used")]
    CodeAlreadyUsed,

    #[error("authorization code expired")]
    CodeExpired,

    #[error("only 'authorization_code' grant type is supported")]
    UnsupportedGrantType,

    #[error("only 'code' response type is supported")]
    UnsupportedResponseType,

    #[error("invalid username or password")]
    AccessDenied,

    #[error("authentication service unavailable")]
    UpstreamUnavailable,

    #[error("{0}")]
    ServerError(String),
}

impl OAuthError {
    /// The OAuth `error` code for the JSON error body.
    pub fn error_code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) | OAuthError::InvalidRedirect(_) => "invalid_request",
            OAuthError::InvalidClientMetadata => "invalid_client_metadata",
            OAuthError::InvalidClient => "invalid_client",
            OAuthError::InvalidGrant(_)
            | OAuthError::CodeNotFound
            | OAuthError::CodeAlreadyUsed
            | OAuthError::CodeExpired => "invalid_grant",
            OAuthError::UnsupportedGrantType => "unsupported_grant_type",
            OAuthError::UnsupportedResponseType => "unsupported_response_type",
            OAuthError::AccessDenied => "access_denied",
            OAuthError::UpstreamUnavailable | OAuthError::ServerError(_) => "server_error",
        }
    }

    /// The HTTP status carrying this error.
    pub fn status(&self) -> u16 {
        match self {
            OAuthError::AccessDenied => 401,
            OAuthError::UpstreamUnavailable => 503,
            OAuthError::ServerError(_) => 500,
            _ => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_failures_share_invalid_grant() {
        assert_eq!(OAuthError::CodeNotFound.error_code(), "invalid_grant");
        assert_eq!(OAuthError::CodeAlreadyUsed.error_code(), "invalid_grant");
        assert_eq!(OAuthError::CodeExpired.error_code(), "invalid_grant");
    }

    #[test]
    fn test_redirect_mismatch_is_invalid_request_on_the_wire() {
        let err = OAuthError::InvalidRedirect("redirect_uri does not match".to_string());
        assert_eq!(err.error_code(), "invalid_request");
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(OAuthError::AccessDenied.status(), 401);
        assert_eq!(OAuthError::UpstreamUnavailable.status(), 503);
        assert_eq!(OAuthError::InvalidClient.status(), 400);
        assert_eq!(OAuthError::ServerError("boom".into()).status(), 500);
    }

    #[test]
    fn test_no_credential_message_names_sources() {
        let err = AuthError::NoCredential(
            "header: not provided; argument: not provided; environment: expired".to_string(),
        );
        let text = err.to_string();
        assert!(text.contains("header"));
        assert!(text.contains("environment: expired"));
    }
}
