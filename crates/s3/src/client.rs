//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from osn-core.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use bytes::Bytes;
use osn_core::{Credentials, Error, ListPage, MAX_LIST_PAGE, ObjectStore, Result};

/// S3 client wrapper bound to one endpoint
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    endpoint: String,
}

impl S3Client {
    /// Create a new S3 client from validated credentials
    ///
    /// No request is sent; bad keys only show up on the first call.
    pub async fn new(credentials: &Credentials) -> Result<Self> {
        credentials.validate()?;

        let provider = aws_credential_types::Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            None, // session token
            None, // expiry
            "osn-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(provider)
            .region(aws_config::Region::new(credentials.region.clone()))
            .endpoint_url(&credentials.endpoint_url)
            .load()
            .await;

        // Path-style addressing works with every S3-compatible server
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(true)
            .build();

        tracing::debug!(
            endpoint = %credentials.endpoint_url,
            region = %credentials.region,
            access_key = %credentials.masked_access_key(),
            "Created S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            endpoint: credentials.endpoint_url.clone(),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Names of all buckets visible to the credentials
    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "list buckets"))?;

        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }
}

/// Format AWS SDK error into a detailed error message
fn format_sdk_error<E: std::fmt::Display>(error: &SdkError<E>) -> String {
    match error {
        SdkError::ServiceError(service_err) => {
            let err = service_err.err();
            let meta = service_err.raw();
            let mut msg = format!("Service error: {err}");
            if let Some(code) = meta.headers().get("x-amz-error-code") {
                msg.push_str(&format!(" (code: {code})"));
            }
            msg
        }
        SdkError::ConstructionFailure(err) => format!("Request construction failed: {err:?}"),
        SdkError::TimeoutError(_) => "Request timeout".to_string(),
        SdkError::DispatchFailure(err) => format!("Network dispatch error: {err:?}"),
        SdkError::ResponseError(err) => format!("Response error: {err:?}"),
        _ => error.to_string(),
    }
}

/// Map an SDK failure onto the osn error taxonomy
fn map_sdk_error<E>(error: SdkError<E>, target: &str) -> Error
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    let status = error.raw_response().map(|r| r.status().as_u16());
    let code = error.code().map(str::to_string);
    let detail = format_sdk_error(&error);
    classify(code.as_deref(), status, target, detail)
}

fn classify(code: Option<&str>, status: Option<u16>, target: &str, detail: String) -> Error {
    match (code, status) {
        (Some("NoSuchKey" | "NoSuchBucket" | "NotFound"), _) | (_, Some(404)) => {
            Error::NotFound(format!("{target}: {detail}"))
        }
        (
            Some(
                "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken",
            ),
            _,
        )
        | (_, Some(401 | 403)) => Error::Auth(detail),
        _ => Error::Transfer(detail),
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: Option<String>,
    ) -> Result<()> {
        let body = aws_sdk_s3::primitives::ByteStream::from(data);

        self.inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .set_content_type(content_type)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &format!("{bucket}/{key}")))?;

        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &format!("{bucket}/{key}")))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Transfer(format!("Reading body of {bucket}/{key}: {e}")))?
            .into_bytes();

        Ok(data)
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage> {
        let mut request = self
            .inner
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(MAX_LIST_PAGE as i32);

        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if let Some(token) = continuation {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &format!("Bucket {bucket}")))?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();

        let next_continuation = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage {
            keys,
            next_continuation,
        })
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires: Duration) -> Result<String> {
        let config = aws_sdk_s3::presigning::PresigningConfig::expires_in(expires)
            .map_err(|e| Error::Config(format!("presign_get config: {e}")))?;

        let request = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| Error::General(format!("presign_get: {e}")))?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("AKIAEXAMPLE", "secret", "http://localhost:9000").unwrap()
    }

    #[test]
    fn test_classify_not_found() {
        let err = classify(Some("NoSuchKey"), Some(404), "b/k.csv", "gone".into());
        assert!(matches!(err, Error::NotFound(msg) if msg.starts_with("b/k.csv")));

        // HEAD-style responses carry no code, only the status
        let err = classify(None, Some(404), "b/k.csv", "gone".into());
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_classify_auth() {
        for code in ["AccessDenied", "InvalidAccessKeyId", "SignatureDoesNotMatch"] {
            let err = classify(Some(code), Some(403), "b", "denied".into());
            assert!(matches!(err, Error::Auth(_)), "{code}");
        }
        assert!(matches!(
            classify(None, Some(401), "b", "denied".into()),
            Error::Auth(_)
        ));
    }

    #[test]
    fn test_classify_transfer() {
        assert!(matches!(
            classify(Some("SlowDown"), Some(503), "b", "slow".into()),
            Error::Transfer(_)
        ));
        assert!(matches!(
            classify(None, None, "b", "Request timeout".into()),
            Error::Transfer(_)
        ));
    }

    #[tokio::test]
    async fn test_new_does_not_touch_network() {
        let client = S3Client::new(&credentials()).await.unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9000");
    }

    #[tokio::test]
    async fn test_presign_is_local() {
        let client = S3Client::new(&credentials()).await.unwrap();
        let url = client
            .presign_get("pv-data", "runs/cell.csv", Duration::from_secs(600))
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/pv-data/runs/cell.csv?"));
        assert!(url.contains("X-Amz-Expires=600"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_invalid_credentials_rejected() {
        let mut creds = credentials();
        creds.endpoint_url = "localhost".into();
        assert!(matches!(
            S3Client::new(&creds).await,
            Err(Error::Config(_))
        ));
    }
}
