//! osn-core: Core library for the osn bucket synchronization tool
//!
//! This crate provides:
//! - Credential loading and validation
//! - Settings management
//! - The `ObjectStore` trait and an in-memory implementation
//! - Batching, retry and transfer reports
//! - The sync engine (upload, download, bucket-to-bucket transfer)
//!
//! It does not depend on any specific S3 SDK; `osn-s3` supplies the
//! production backend.

pub mod batch;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod memory;
pub mod report;
pub mod retry;
pub mod sync;
pub mod traits;

pub use batch::{DEFAULT_BATCH_SIZE, batch};
pub use config::{Config, ConfigManager, DownloadStrategy, RetryConfig, SyncSettings};
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use report::{Operation, Outcome, Report, SkipReason, Summary};
pub use retry::{RetryBuilder, is_retryable_error, retry_with_backoff};
pub use sync::{Download, DownloadTarget, ProgressObserver, SyncEngine, SyncOptions};
pub use traits::{ListPage, MAX_LIST_PAGE, ObjectStore, ObjectStoreExt};
