//! Local files to bucket

use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::{ItemResult, SyncEngine};
use crate::error::{Error, Result};
use crate::report::{Operation, Outcome, Report};
use crate::traits::ObjectStore;

impl<S: ObjectStore> SyncEngine<S> {
    /// Upload local files into `bucket` under `prefix`
    ///
    /// Each file lands at `prefix/<file name>` (or `<file name>` with an empty
    /// prefix) and is reported under its file name. Files that no longer exist
    /// are reported as `missing`.
    pub async fn upload(&self, files: &[PathBuf], bucket: &str, prefix: &str) -> Result<Report> {
        let mut report = Report::new(Operation::Upload, bucket);
        if files.is_empty() {
            tracing::info!(bucket, "No files to upload");
            return Ok(report.finish());
        }

        tracing::info!(bucket, prefix, files = files.len(), "Starting upload");
        self.run_batches(files, &mut report, |path| {
            self.upload_one(path, bucket, prefix)
        })
        .await?;

        let report = report.finish();
        self.log_summary(&report);
        Ok(report)
    }

    async fn upload_one(&self, path: &Path, bucket: &str, prefix: &str) -> ItemResult {
        let name = file_name(path);

        let data = match tokio::fs::read(path).await {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Local file missing");
                return ItemResult::new(name, Outcome::Missing);
            }
            Err(e) => return ItemResult::failed(name, &Error::Io(e)),
        };

        let key = remote_key(prefix, &name);
        let size = data.len() as u64;
        match self.put_with_retry(self.store.as_ref(), bucket, &key, data).await {
            Ok(()) => {
                tracing::debug!(bucket, key = %key, size, "Uploaded");
                ItemResult::success(name, size)
            }
            Err(e) => ItemResult::failed(name, &e),
        }
    }
}

/// Final path component, or the whole path when it has none
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Remote key for a file name under `prefix`
pub fn remote_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
