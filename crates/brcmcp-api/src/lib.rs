//! Outbound HTTP clients for the BV-BRC service APIs.
//!
//! Three remote collaborators are reached from here:
//! - the Solr-backed data API ([`solr::DataClient`]),
//! - the JSON-RPC workspace and app-service APIs ([`rpc::RpcClient`]),
//! - the identity provider's authentication endpoint ([`identity`]).
//!
//! Every call carries a bounded timeout and is issued exactly once; there
//! is no retry policy here. Callers decide whether to re-invoke.

pub mod error;
pub mod identity;
pub mod rpc;
pub mod solr;
pub mod transfer;

pub use error::{ApiError, ApiResult};
pub use rpc::RpcClient;
pub use solr::{DataClient, QueryOptions, QueryPage};

use std::time::Duration;

/// Default timeout for outbound calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the shared reqwest client used by all outbound callers.
pub fn http_client(timeout: Duration) -> ApiResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("brcmcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::Unreachable(format!("failed to build HTTP client: {e}")))
}
