//! Bucket to bucket, across endpoints

use super::{ItemResult, SyncEngine};
use crate::error::Result;
use crate::report::{Operation, Report, SkipReason};
use crate::traits::{ObjectStore, ObjectStoreExt};

impl<S: ObjectStore> SyncEngine<S> {
    /// Copy every object under `prefix` from `source_bucket` into
    /// `dest_bucket` on `dest`
    ///
    /// Each body is held in memory between the get and the put; nothing is
    /// staged on disk. Keys keep their names. A failed key is recorded and the
    /// run continues.
    pub async fn transfer<D: ObjectStore + ?Sized>(
        &self,
        source_bucket: &str,
        dest: &D,
        dest_bucket: &str,
        prefix: &str,
    ) -> Result<Report> {
        let mut report = Report::new(Operation::Transfer, source_bucket);
        report.destination = Some(dest_bucket.to_string());

        let keys = self.store.collect_keys(source_bucket, prefix).await?;
        if keys.is_empty() {
            tracing::info!(source_bucket, prefix, "No objects to transfer");
            return Ok(report.finish());
        }

        tracing::info!(
            source_bucket,
            dest_bucket,
            prefix,
            keys = keys.len(),
            "Starting transfer"
        );
        self.run_batches(&keys, &mut report, |key| {
            self.transfer_one(source_bucket, dest, dest_bucket, key)
        })
        .await?;

        let report = report.finish();
        self.log_summary(&report);
        Ok(report)
    }

    async fn transfer_one<D: ObjectStore + ?Sized>(
        &self,
        source_bucket: &str,
        dest: &D,
        dest_bucket: &str,
        key: &str,
    ) -> ItemResult {
        if key.ends_with('/') {
            return ItemResult::skipped(key, SkipReason::Folder);
        }

        let data = match self
            .get_with_retry(self.store.as_ref(), source_bucket, key)
            .await
        {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(bucket = source_bucket, key, error = %e, "Source read failed");
                return ItemResult::failed(key, &e);
            }
        };

        let size = data.len() as u64;
        match self.put_with_retry(dest, dest_bucket, key, data).await {
            Ok(()) => {
                tracing::debug!(source_bucket, dest_bucket, key, size, "Transferred");
                ItemResult::success(key, size)
            }
            Err(e) => {
                tracing::warn!(bucket = dest_bucket, key, error = %e, "Destination write failed");
                ItemResult::failed(key, &e)
            }
        }
    }
}
