//! Plain HTTP fetch of presigned URLs

use bytes::Bytes;

use crate::error::{Error, Result};

/// GET a presigned URL and return the body
pub async fn fetch_presigned(client: &reqwest::Client, url: &str) -> Result<Bytes> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Transfer(describe(&e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(match status.as_u16() {
            404 => Error::NotFound(format!("HTTP {status}")),
            401 | 403 => Error::Auth(format!("HTTP {status}")),
            _ => Error::Transfer(format!("HTTP {status}")),
        });
    }

    response
        .bytes()
        .await
        .map_err(|e| Error::Transfer(describe(&e)))
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Request timeout: {error}")
    } else if error.is_connect() {
        format!("Connection refused: {error}")
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_scheme_is_transfer_error() {
        let client = reqwest::Client::new();
        let result = fetch_presigned(&client, "memory://bucket/key.txt").await;
        assert!(matches!(result, Err(Error::Transfer(_))));
    }
}
