//! Raw byte transfer against workspace download/upload URLs.
//!
//! The workspace JSON-RPC API hands out Shock node URLs; the bytes then
//! move over plain HTTP. Downloads carry the raw token in `Authorization`,
//! uploads use the `OAuth` scheme the Shock service expects.

use crate::error::{ApiError, ApiResult};
use tracing::debug;

/// Fetch the contents of a workspace download URL.
pub async fn download(
    client: &reqwest::Client,
    url: &str,
    token: &str,
) -> ApiResult<Vec<u8>> {
    debug!(url, "downloading workspace file");

    let response = client
        .get(url)
        .header("Authorization", token)
        .send()
        .await
        .map_err(ApiError::from_transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: format!("download failed for {url}"),
        });
    }

    let bytes = response.bytes().await.map_err(ApiError::from_transport)?;
    Ok(bytes.to_vec())
}

/// Push file content to a Shock upload URL as multipart form data.
pub async fn upload(
    client: &reqwest::Client,
    url: &str,
    token: &str,
    file_name: &str,
    content: Vec<u8>,
) -> ApiResult<()> {
    debug!(url, file_name, size = content.len(), "uploading workspace file");

    let part = reqwest::multipart::Part::bytes(content)
        .file_name(file_name.to_string())
        .mime_str("application/octet-stream")
        .map_err(|e| ApiError::MalformedResponse(format!("invalid upload part: {e}")))?;
    let form = reqwest::multipart::Form::new().part("upload", part);

    let response = client
        .put(url)
        .header("Authorization", format!("OAuth {token}"))
        .multipart(form)
        .send()
        .await
        .map_err(ApiError::from_transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: format!("upload failed for {file_name}"),
        });
    }

    Ok(())
}
