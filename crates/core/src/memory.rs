//! In-memory object store
//!
//! Backs the sync engine in tests and dry runs. Failures can be injected per
//! key to exercise partial-failure paths.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::traits::{ListPage, MAX_LIST_PAGE, ObjectStore};

/// Kind of failure injected for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Backend rejects the credentials
    Auth(String),
    /// Backend or transport failure
    Transfer(String),
}

impl Fault {
    fn to_error(&self) -> Error {
        match self {
            Fault::Auth(msg) => Error::Auth(msg.clone()),
            Fault::Transfer(msg) => Error::Transfer(msg.clone()),
        }
    }
}

/// Object store holding every bucket in process memory
#[derive(Debug)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, BTreeMap<String, Bytes>>>,
    faults: Mutex<HashMap<String, Fault>>,
    page_size: usize,
    presign_rejected: AtomicBool,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            faults: Mutex::new(HashMap::new()),
            page_size: MAX_LIST_PAGE,
            presign_rejected: AtomicBool::new(false),
            get_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
        }
    }

    /// Use a smaller listing page, clamped to `1..=MAX_LIST_PAGE`
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_LIST_PAGE);
        self
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.lock_buckets().entry(bucket.to_string()).or_default();
    }

    /// Insert an object directly, creating the bucket if needed
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.lock_buckets()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.lock_buckets()
            .get(bucket)
            .and_then(|objects| objects.get(key).cloned())
    }

    /// All keys of a bucket in lexicographic order
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock_buckets()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Make every get/put of `key` fail with `fault`
    pub fn inject_fault(&self, key: &str, fault: Fault) {
        self.lock_faults().insert(key.to_string(), fault);
    }

    pub fn clear_fault(&self, key: &str) {
        self.lock_faults().remove(key);
    }

    /// Make every presign request fail
    pub fn reject_presign(&self, rejected: bool) {
        self.presign_rejected.store(rejected, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    fn check_fault(&self, key: &str) -> Result<()> {
        match self.lock_faults().get(key) {
            Some(fault) => Err(fault.to_error()),
            None => Ok(()),
        }
    }

    fn lock_buckets(&self) -> std::sync::MutexGuard<'_, HashMap<String, BTreeMap<String, Bytes>>> {
        // a panic while holding the lock leaves plain data behind, still usable
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_faults(&self) -> std::sync::MutexGuard<'_, HashMap<String, Fault>> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn no_such_bucket(bucket: &str) -> Error {
    Error::NotFound(format!("Bucket not found: {bucket}"))
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        _content_type: Option<String>,
    ) -> Result<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fault(key)?;

        let mut buckets = self.lock_buckets();
        let objects = buckets.get_mut(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fault(key)?;

        let buckets = self.lock_buckets();
        let objects = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{bucket}/{key}")))
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage> {
        let buckets = self.lock_buckets();
        let objects = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;

        let start = match &continuation {
            Some(token) => Bound::Excluded(token.clone()),
            None => Bound::Included(prefix.to_string()),
        };

        let mut matching = objects
            .range((start, Bound::Unbounded))
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix));

        let keys: Vec<String> = matching.by_ref().take(self.page_size).cloned().collect();
        let has_more = matching.next().is_some();

        Ok(ListPage {
            next_continuation: if has_more { keys.last().cloned() } else { None },
            keys,
        })
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires: Duration) -> Result<String> {
        if self.presign_rejected.load(Ordering::SeqCst) {
            return Err(Error::Auth(format!("presign rejected for {bucket}/{key}")));
        }
        Ok(format!(
            "memory://{bucket}/{key}?expires={}",
            expires.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ObjectStoreExt;

    #[tokio::test]
    async fn test_put_get() {
        let store = MemoryStore::new();
        store.create_bucket("b");
        store
            .put_object("b", "x.bin", Bytes::from_static(b"abc"), None)
            .await
            .unwrap();
        assert_eq!(store.get_object("b", "x.bin").await.unwrap(), "abc");
        assert_eq!(store.put_calls(), 1);
        assert_eq!(store.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_bucket_and_key() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_object("nope", "k").await,
            Err(Error::NotFound(_))
        ));
        store.create_bucket("b");
        assert!(matches!(
            store.get_object("b", "k").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.put_object("nope", "k", Bytes::new(), None).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_paging_covers_all_keys() {
        let store = MemoryStore::new().with_page_size(3);
        for i in 0..10 {
            store.insert("b", &format!("run/{i:02}.csv"), "x");
        }
        store.insert("b", "other/z.csv", "x");

        let first = store.list_page("b", "run/", None).await.unwrap();
        assert_eq!(first.keys.len(), 3);
        assert_eq!(first.next_continuation.as_deref(), Some("run/02.csv"));

        let keys = store.collect_keys("b", "run/").await.unwrap();
        assert_eq!(keys.len(), 10);
        assert!(keys.iter().all(|k| k.starts_with("run/")));

        // listing restarts from the beginning every time
        assert_eq!(store.collect_keys("b", "run/").await.unwrap(), keys);
    }

    #[tokio::test]
    async fn test_exact_page_boundary() {
        let store = MemoryStore::new().with_page_size(2);
        store.insert("b", "a.txt", "1");
        store.insert("b", "b.txt", "2");

        let page = store.list_page("b", "", None).await.unwrap();
        assert_eq!(page.keys.len(), 2);
        assert!(page.next_continuation.is_none());
    }

    #[tokio::test]
    async fn test_injected_fault() {
        let store = MemoryStore::new();
        store.insert("b", "bad.csv", "x");
        store.inject_fault("bad.csv", Fault::Auth("AccessDenied".into()));
        assert!(matches!(
            store.get_object("b", "bad.csv").await,
            Err(Error::Auth(_))
        ));

        store.clear_fault("bad.csv");
        assert!(store.get_object("b", "bad.csv").await.is_ok());
    }

    #[tokio::test]
    async fn test_presign_rejection() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        assert!(store.presign("b", "k.txt", ttl).await.is_some());
        store.reject_presign(true);
        assert!(store.presign("b", "k.txt", ttl).await.is_none());
    }
}
