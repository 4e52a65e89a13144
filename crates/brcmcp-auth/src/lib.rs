//! Credential resolution and OAuth2 authorization state.
//!
//! Two concerns live here: the [`token`] module resolves a caller's
//! BV-BRC credential from an ordered chain of sources, and the [`oauth`]
//! module holds the authorization-server state machine that fronts the
//! identity provider for OAuth2 clients.

pub mod error;
pub mod oauth;
pub mod token;

pub use error::{AuthError, OAuthError};
pub use oauth::{
    ClientRegistration, InMemoryOAuthStore, OAuthService, OAuthStore, RegisteredClient,
    TokenGrant, TokenRequest,
};
pub use token::{Credential, TokenContext, TokenProvider};
