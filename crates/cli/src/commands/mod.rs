//! Command implementations
//!
//! Each command returns an [`ExitCode`]; errors are printed through the
//! [`Formatter`] before returning.

pub mod completions;
pub mod download;
pub mod ls;
pub mod share;
pub mod transfer;
pub mod upload;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use osn_core::{Config, Credentials, Report, SyncEngine, SyncOptions};
use osn_s3::S3Client;
use tokio_util::sync::CancellationToken;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Progress};

/// Everything a command needs besides its own arguments
#[derive(Debug, Clone)]
pub struct Context {
    pub output: OutputConfig,
    /// `--credentials` flag, if given
    pub credentials: Option<PathBuf>,
    pub settings: Config,
    /// Cancelled on Ctrl-C
    pub cancel: CancellationToken,
}

/// Batching flags that override the settings file
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Items per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Items transferred in parallel within a batch
    #[arg(long)]
    pub concurrency: Option<usize>,
}

impl SyncArgs {
    pub fn options(&self, settings: &Config) -> SyncOptions {
        let mut options = SyncOptions::from(settings);
        if let Some(batch_size) = self.batch_size {
            options = options.with_batch_size(batch_size);
        }
        if let Some(concurrency) = self.concurrency {
            options = options.with_concurrency(concurrency);
        }
        options
    }
}

/// Credentials from `path`, else the settings file, else the environment
pub fn load_credentials(
    path: Option<&Path>,
    settings: &Config,
    formatter: &Formatter,
) -> Result<Credentials, ExitCode> {
    let result = match path.or(settings.credentials_file.as_deref()) {
        Some(path) => Credentials::load(path),
        None => Credentials::from_env(),
    };

    result.map_err(|e| {
        formatter.error(&format!("Failed to load credentials: {e}"));
        ExitCode::from_error(&e)
    })
}

/// S3 client for the main credentials of this invocation
pub async fn connect(ctx: &Context, formatter: &Formatter) -> Result<Arc<S3Client>, ExitCode> {
    let credentials = load_credentials(ctx.credentials.as_deref(), &ctx.settings, formatter)?;
    connect_with(&credentials, formatter).await
}

pub async fn connect_with(
    credentials: &Credentials,
    formatter: &Formatter,
) -> Result<Arc<S3Client>, ExitCode> {
    match S3Client::new(credentials).await {
        Ok(client) => Ok(Arc::new(client)),
        Err(e) => {
            formatter.error(&format!("Failed to create S3 client: {e}"));
            Err(ExitCode::from_error(&e))
        }
    }
}

/// Sync engine wired to the Ctrl-C token and a progress bar
pub fn engine(
    client: Arc<S3Client>,
    options: SyncOptions,
    ctx: &Context,
    progress: &Progress,
    formatter: &Formatter,
) -> Result<SyncEngine<S3Client>, ExitCode> {
    match SyncEngine::new(client, options) {
        Ok(engine) => Ok(engine
            .with_cancellation(ctx.cancel.clone())
            .with_observer(progress.observer())),
        Err(e) => {
            formatter.error(&e.to_string());
            Err(ExitCode::from_error(&e))
        }
    }
}

/// Print a finished report and pick the exit code for it
pub fn finish_report(report: &Report, formatter: &Formatter) -> ExitCode {
    formatter.report(report);
    exit_code_for(report)
}

fn exit_code_for(report: &Report) -> ExitCode {
    if report.cancelled {
        ExitCode::Interrupted
    } else if report.is_success() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    }
}
