//! Outbound call error taxonomy.

use thiserror::Error;

/// Result type for outbound API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur on an outbound call.
///
/// The three variants are deliberately distinct: callers retrying an
/// `Unreachable` failure is reasonable, retrying a `Rejected` one is not.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote service could not be reached (network failure or timeout).
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    /// The remote service answered with a non-success status.
    #[error("upstream rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The remote service answered 2xx but the body could not be parsed.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// Map a reqwest transport error to the taxonomy.
    ///
    /// Timeouts are folded into `Unreachable`: from the caller's view the
    /// service did not answer within the bound.
    pub fn from_transport(err: reqwest::Error) -> Self {
        ApiError::Unreachable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ApiError::Rejected {
            status: 401,
            message: "token expired".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "upstream rejected request (HTTP 401): token expired"
        );

        let err = ApiError::Unreachable("connection refused".to_string());
        assert!(err.to_string().contains("unreachable"));
    }
}
