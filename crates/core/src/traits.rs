//! ObjectStore trait definition
//!
//! This trait defines the interface for S3-compatible storage operations.
//! It allows the sync engine to be independent of the specific SDK used.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::error::{Error, Result};

/// Largest page a listing call returns
pub const MAX_LIST_PAGE: usize = 1000;

/// One page of a key listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Token for the following page; `None` on the last page
    pub next_continuation: Option<String>,
}

/// Capability set of one storage endpoint
///
/// Implementations address buckets by name; the same client can serve any
/// bucket the credentials can reach.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` at `key`, replacing any existing object
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: Option<String>,
    ) -> Result<()>;

    /// Fetch the full body of `key`; `Error::NotFound` if it does not exist
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Fetch one page of keys under `prefix`, at most [`MAX_LIST_PAGE`] long
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage>;

    /// Generate a presigned GET URL valid for `expires`
    async fn presign_get(&self, bucket: &str, key: &str, expires: Duration) -> Result<String>;
}

/// Helpers available on every [`ObjectStore`]
#[async_trait]
pub trait ObjectStoreExt: ObjectStore {
    /// Lazily enumerate every key under `prefix`
    ///
    /// Pages are fetched on demand. Each call starts a fresh listing from the
    /// beginning.
    fn list_keys<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> BoxStream<'a, Result<String>>;

    /// Collect [`ObjectStoreExt::list_keys`] into a vector
    async fn collect_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Presigned GET URL, or `None` after logging why it could not be made
    async fn presign(&self, bucket: &str, key: &str, expires: Duration) -> Option<String>;
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {
    fn list_keys<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> BoxStream<'a, Result<String>> {
        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let continuation = match cursor {
                Cursor::Done => return Ok::<_, Error>(None),
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };

            let page = self.list_page(bucket, prefix, continuation.clone()).await?;
            tracing::trace!(bucket, prefix, keys = page.keys.len(), "Fetched listing page");

            let next = match page.next_continuation {
                // a token that does not advance would loop forever
                Some(token) if Some(&token) != continuation.as_ref() => Cursor::Next(token),
                _ => Cursor::Done,
            };
            Ok(Some((stream::iter(page.keys.into_iter().map(Ok)), next)))
        })
        .try_flatten()
        .boxed()
    }

    async fn collect_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        self.list_keys(bucket, prefix).try_collect().await
    }

    async fn presign(&self, bucket: &str, key: &str, expires: Duration) -> Option<String> {
        match self.presign_get(bucket, key, expires).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(bucket, key, error = %e, "Failed to presign object");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_list_keys_follows_continuation() {
        let mut store = MockObjectStore::new();
        store
            .expect_list_page()
            .with(eq("data"), eq("runs/"), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| {
                Ok(ListPage {
                    keys: vec!["runs/a.csv".into(), "runs/b.csv".into()],
                    next_continuation: Some("t1".into()),
                })
            });
        store
            .expect_list_page()
            .with(eq("data"), eq("runs/"), eq(Some("t1".to_string())))
            .times(1)
            .returning(|_, _, _| {
                Ok(ListPage {
                    keys: vec!["runs/c.csv".into()],
                    next_continuation: None,
                })
            });

        let keys = store.collect_keys("data", "runs/").await.unwrap();
        assert_eq!(keys, vec!["runs/a.csv", "runs/b.csv", "runs/c.csv"]);
    }

    #[tokio::test]
    async fn test_list_keys_is_lazy() {
        let mut store = MockObjectStore::new();
        store.expect_list_page().times(1).returning(|_, _, _| {
            Ok(ListPage {
                keys: vec!["a.txt".into(), "b.txt".into()],
                next_continuation: Some("more".into()),
            })
        });

        // Only the first page is requested when the consumer stops early
        let first: Vec<String> = store
            .list_keys("bucket", "")
            .take(2)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(first, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_list_keys_stops_on_repeated_token() {
        let mut store = MockObjectStore::new();
        store.expect_list_page().times(2).returning(|_, _, _| {
            Ok(ListPage {
                keys: vec!["a.txt".into()],
                next_continuation: Some("same".into()),
            })
        });

        let keys = store.collect_keys("bucket", "").await.unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn test_list_keys_propagates_error() {
        let mut store = MockObjectStore::new();
        store
            .expect_list_page()
            .returning(|bucket, _, _| Err(Error::NotFound(format!("Bucket not found: {bucket}"))));

        let result = store.collect_keys("missing", "").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_presign_fails_soft() {
        let mut store = MockObjectStore::new();
        store
            .expect_presign_get()
            .returning(|_, _, _| Err(Error::Auth("SignatureDoesNotMatch".into())));

        assert!(
            store
                .presign("bucket", "a.txt", Duration::from_secs(60))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_presign_success() {
        let mut store = MockObjectStore::new();
        store
            .expect_presign_get()
            .with(eq("bucket"), eq("a.txt"), eq(Duration::from_secs(3600)))
            .returning(|b, k, _| Ok(format!("https://example.com/{b}/{k}?X-Amz-Signature=abc")));

        let url = store
            .presign("bucket", "a.txt", Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(url.starts_with("https://example.com/bucket/a.txt"));
    }
}
