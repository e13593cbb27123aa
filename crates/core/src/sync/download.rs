//! Bucket to memory or local directory

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::{ItemResult, SyncEngine, pseudo_folder_reason};
use crate::config::DownloadStrategy;
use crate::error::{Error, Result};
use crate::fetch::fetch_presigned;
use crate::report::{Operation, Report, SkipReason};
use crate::retry::{is_retryable_error, retry_with_backoff};
use crate::traits::{ObjectStore, ObjectStoreExt};

/// Where downloaded objects end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    /// Keep bodies in [`Download::objects`]
    Memory,
    /// Write each object to `<root>/<key>`
    Filesystem(PathBuf),
}

impl DownloadTarget {
    /// `<bucket>_download` in the working directory
    pub fn default_dir(bucket: &str) -> Self {
        DownloadTarget::Filesystem(PathBuf::from(format!("{bucket}_download")))
    }
}

/// Report plus any bodies kept in memory
#[derive(Debug, Clone)]
pub struct Download {
    pub report: Report,
    /// Successfully fetched bodies; empty for filesystem targets
    pub objects: BTreeMap<String, Bytes>,
}

impl<S: ObjectStore> SyncEngine<S> {
    /// Download `keys` from `bucket`, or every key under `prefix` when `keys`
    /// is empty
    ///
    /// Keys ending in `/` or without an extension are reported as skipped and
    /// never fetched.
    pub async fn download(
        &self,
        bucket: &str,
        keys: &[String],
        prefix: &str,
        target: &DownloadTarget,
    ) -> Result<Download> {
        let mut report = Report::new(Operation::Download, bucket);

        let listed;
        let keys = if keys.is_empty() {
            listed = self.store.collect_keys(bucket, prefix).await?;
            &listed[..]
        } else {
            keys
        };

        if keys.is_empty() {
            tracing::info!(bucket, prefix, "No objects to download");
            return Ok(Download {
                report: report.finish(),
                objects: BTreeMap::new(),
            });
        }

        tracing::info!(
            bucket,
            keys = keys.len(),
            strategy = ?self.options.download_strategy,
            "Starting download"
        );
        let objects = self
            .run_batches(keys, &mut report, |key| self.download_one(bucket, key, target))
            .await?;

        let report = report.finish();
        self.log_summary(&report);
        Ok(Download { report, objects })
    }

    async fn download_one(&self, bucket: &str, key: &str, target: &DownloadTarget) -> ItemResult {
        if let Some(reason) = pseudo_folder_reason(key) {
            tracing::debug!(bucket, key, reason = %reason, "Skipping pseudo-folder");
            return ItemResult::skipped(key, reason);
        }

        let data = match self.options.download_strategy {
            DownloadStrategy::Direct => self.get_with_retry(self.store.as_ref(), bucket, key).await,
            DownloadStrategy::Presigned => {
                let Some(url) = self.store.presign(bucket, key, self.options.presign_ttl).await
                else {
                    return ItemResult::skipped(key, SkipReason::PresignFailed);
                };
                retry_with_backoff(
                    &self.options.retry,
                    || fetch_presigned(&self.http, &url),
                    is_retryable_error,
                )
                .await
            }
        };

        let data = match data {
            Ok(data) => data,
            Err(e) => return ItemResult::failed(key, &e),
        };
        let size = data.len() as u64;

        match target {
            DownloadTarget::Memory => ItemResult {
                body: Some(data),
                ..ItemResult::success(key, size)
            },
            DownloadTarget::Filesystem(root) => match write_object(root, key, &data).await {
                Ok(path) => {
                    tracing::debug!(bucket, key, path = %path.display(), size, "Downloaded");
                    ItemResult::success(key, size)
                }
                Err(e) => ItemResult::failed(key, &e),
            },
        }
    }
}

/// Local path of `key` under `root`, refusing keys that climb out of it
pub fn local_path(root: &Path, key: &str) -> Result<PathBuf> {
    let mut path = root.to_path_buf();
    for part in key.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                return Err(Error::General(format!(
                    "Key escapes the download directory: {key}"
                )));
            }
            part => path.push(part),
        }
    }
    Ok(path)
}

async fn write_object(root: &Path, key: &str, data: &[u8]) -> Result<PathBuf> {
    let path = local_path(root, key)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, data).await?;
    Ok(path)
}
