//! Authentication against the BV-BRC identity provider.
//!
//! The provider takes a form-encoded username/password POST and answers
//! with the signed token as plain body text. Anything other than a 2xx
//! means the credentials were not accepted.

use crate::error::{ApiError, ApiResult};
use tracing::debug;

/// Exchange a username and password for a signed token.
///
/// The returned token is the response body with surrounding whitespace
/// stripped. The password never appears in logs or error messages.
pub async fn authenticate(
    client: &reqwest::Client,
    authentication_url: &str,
    username: &str,
    password: &str,
) -> ApiResult<String> {
    debug!(username, "authenticating against identity provider");

    let response = client
        .post(authentication_url)
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .map_err(ApiError::from_transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: "authentication failed".to_string(),
        });
    }

    let token = response
        .text()
        .await
        .map_err(ApiError::from_transport)?
        .trim()
        .to_string();

    if token.is_empty() {
        return Err(ApiError::MalformedResponse(
            "identity provider returned an empty token".to_string(),
        ));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> reqwest::Client {
        crate::http_client(std::time::Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_token_is_trimmed_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authenticate"))
            .and(body_string_contains("username=alice"))
            .and(body_string_contains("password=s3cret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("un=alice|sig=deadbeef\n"),
            )
            .mount(&server)
            .await;

        let token = authenticate(
            &client(),
            &format!("{}/authenticate", server.uri()),
            "alice",
            "s3cret",
        )
        .await
        .unwrap();
        assert_eq!(token, "un=alice|sig=deadbeef");
    }

    #[tokio::test]
    async fn test_bad_credentials_rejected_without_body_leak() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("wrong password for alice"))
            .mount(&server)
            .await;

        let err = authenticate(&client(), &server.uri(), "alice", "nope")
            .await
            .unwrap_err();
        match err {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert!(!message.contains("alice"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("   \n"))
            .mount(&server)
            .await;

        let err = authenticate(&client(), &server.uri(), "alice", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(_)));
    }
}
