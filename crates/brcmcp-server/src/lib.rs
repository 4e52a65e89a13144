//! MCP transport shims for the BV-BRC tool server.
//!
//! One request core ([`core::McpServer`]) serves two transports: an
//! axum HTTP shim that also mounts the OAuth2 front door, and a
//! newline-delimited stdio shim for clients that spawn the server as a
//! subprocess.

pub mod core;
pub mod http;
pub mod oauth_http;
pub mod protocol;
pub mod stdio;

pub use core::McpServer;
pub use http::router;
pub use oauth_http::OAuthState;
