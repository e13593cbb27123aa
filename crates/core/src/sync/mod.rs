//! Sync engine
//!
//! Drives upload, download and bucket-to-bucket transfer through an
//! [`ObjectStore`], one batch at a time. Every item ends in exactly one
//! [`Outcome`]; individual failures are recorded in the [`Report`] and never
//! abort the run.
//!
//! Items within a batch run through a bounded pool (`concurrency`, default 1)
//! and are recorded in input order. A [`CancellationToken`] is checked before
//! each item starts; cancelling stops scheduling and returns the partial
//! report.

mod download;
mod transfer;
mod upload;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::batch::{DEFAULT_BATCH_SIZE, batch};
use crate::config::{Config, DEFAULT_PRESIGN_TTL_SECS, DownloadStrategy, RetryConfig};
use crate::error::{Error, Result};
use crate::report::{Outcome, Report, SkipReason};
use crate::retry::{is_retryable_error, retry_with_backoff};
use crate::traits::ObjectStore;

pub use download::{Download, DownloadTarget};

/// Called after every item with its identifier and outcome
pub type ProgressObserver = Arc<dyn Fn(&str, &Outcome) + Send + Sync>;

/// Tuning for a [`SyncEngine`]
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub concurrency: usize,
    pub presign_ttl: Duration,
    pub download_strategy: DownloadStrategy,
    pub retry: RetryConfig,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: 1,
            presign_ttl: Duration::from_secs(DEFAULT_PRESIGN_TTL_SECS),
            download_strategy: DownloadStrategy::Direct,
            retry: RetryConfig::default(),
        }
    }
}

impl From<&Config> for SyncOptions {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.sync.batch_size,
            concurrency: config.sync.concurrency,
            presign_ttl: config.sync.presign_ttl(),
            download_strategy: config.sync.download_strategy,
            retry: config.retry.clone(),
        }
    }
}

impl SyncOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_download_strategy(mut self, strategy: DownloadStrategy) -> Self {
        self.download_strategy = strategy;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_presign_ttl(mut self, ttl: Duration) -> Self {
        self.presign_ttl = ttl;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be greater than 0".into()));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be greater than 0".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Result of processing one item
struct ItemResult {
    id: String,
    outcome: Outcome,
    bytes: u64,
    /// Object body kept for in-memory downloads
    body: Option<Bytes>,
}

impl ItemResult {
    fn new(id: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            id: id.into(),
            outcome,
            bytes: 0,
            body: None,
        }
    }

    fn success(id: impl Into<String>, bytes: u64) -> Self {
        Self {
            bytes,
            ..Self::new(id, Outcome::Success)
        }
    }

    fn skipped(id: impl Into<String>, reason: SkipReason) -> Self {
        Self::new(id, Outcome::Skipped(reason))
    }

    fn failed(id: impl Into<String>, error: &Error) -> Self {
        Self::new(id, Outcome::from_error(error))
    }
}

/// Batched, reported synchronization against one object store
pub struct SyncEngine<S: ObjectStore> {
    store: Arc<S>,
    options: SyncOptions,
    cancel: CancellationToken,
    observer: Option<ProgressObserver>,
    http: reqwest::Client,
}

impl<S: ObjectStore> SyncEngine<S> {
    /// Create an engine; invalid options are a configuration error
    pub fn new(store: Arc<S>, options: SyncOptions) -> Result<Self> {
        options.validate()?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            store,
            options,
            cancel: CancellationToken::new(),
            observer: None,
            http,
        })
    }

    /// Share an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Token that stops the running operation when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run `process` over `items` batch by batch, recording into `report`
    ///
    /// Returns the bodies of items that produced one, keyed by identifier.
    async fn run_batches<'a, T, F, Fut>(
        &self,
        items: &'a [T],
        report: &mut Report,
        process: F,
    ) -> Result<BTreeMap<String, Bytes>>
    where
        F: Fn(&'a T) -> Fut,
        Fut: Future<Output = ItemResult>,
    {
        let mut bodies = BTreeMap::new();
        let batches = batch(items, self.options.batch_size)?;
        let total = batches.len();
        let cancel = &self.cancel;
        let process = &process;

        for (index, chunk) in batches.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            tracing::debug!(
                operation = %report.operation,
                batch = index + 1,
                of = total,
                items = chunk.len(),
                "Processing batch"
            );

            let results = stream::iter(chunk)
                .map(|item| async move {
                    if cancel.is_cancelled() {
                        None
                    } else {
                        Some(process(item).await)
                    }
                })
                .buffered(self.options.concurrency);
            let mut results = std::pin::pin!(results);

            while let Some(result) = results.next().await {
                let Some(result) = result else {
                    report.cancelled = true;
                    continue;
                };

                if let Some(observer) = &self.observer {
                    observer(&result.id, &result.outcome);
                }
                if result.outcome.is_failure() {
                    tracing::warn!(item = %result.id, outcome = %result.outcome, "Item failed");
                    bodies.remove(&result.id);
                }
                if let Some(body) = result.body {
                    bodies.insert(result.id.clone(), body);
                }
                report.add_bytes(result.bytes);
                report.record(result.id, result.outcome);
            }
        }

        if report.cancelled {
            tracing::info!(
                operation = %report.operation,
                completed = report.len(),
                "Run cancelled, returning partial report"
            );
        }
        Ok(bodies)
    }

    async fn get_with_retry<T: ObjectStore + ?Sized>(
        &self,
        store: &T,
        bucket: &str,
        key: &str,
    ) -> Result<Bytes> {
        retry_with_backoff(
            &self.options.retry,
            || store.get_object(bucket, key),
            is_retryable_error,
        )
        .await
    }

    async fn put_with_retry<T: ObjectStore + ?Sized>(
        &self,
        store: &T,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> Result<()> {
        let content_type = content_type_for(key);
        retry_with_backoff(
            &self.options.retry,
            || store.put_object(bucket, key, data.clone(), content_type.clone()),
            is_retryable_error,
        )
        .await
    }

    fn log_summary(&self, report: &Report) {
        let summary = report.summary();
        tracing::info!(
            operation = %report.operation,
            bucket = %report.bucket,
            total = summary.total,
            success = summary.success,
            skipped = summary.skipped,
            failed = summary.failed(),
            bytes = report.bytes_transferred,
            cancelled = report.cancelled,
            "Sync finished"
        );
    }
}

/// Content type guessed from the key's extension
fn content_type_for(key: &str) -> Option<String> {
    mime_guess::from_path(key)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Why a key should not be fetched, if it names a pseudo-folder
pub fn pseudo_folder_reason(key: &str) -> Option<SkipReason> {
    if key.ends_with('/') {
        Some(SkipReason::Folder)
    } else if Path::new(key).extension().is_none() {
        Some(SkipReason::NoExtension)
    } else {
        None
    }
}
