//! download command - Fetch objects from a bucket

use std::path::PathBuf;

use clap::Args;
use osn_core::{DownloadStrategy, DownloadTarget};

use super::{Context, SyncArgs, connect, engine, finish_report};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, Progress};

/// Download objects from a bucket
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Source bucket
    #[arg(short, long)]
    pub bucket: String,

    /// Only keys under this prefix (used when no --key is given)
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Specific keys to download; repeatable. Lists the bucket when absent.
    #[arg(short, long = "key")]
    pub keys: Vec<String>,

    /// Keep objects in memory instead of writing them to disk
    #[arg(long, conflicts_with = "output")]
    pub memory: bool,

    /// Local directory (default: <bucket>_download)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fetch through presigned URLs instead of authenticated requests
    #[arg(long)]
    pub presigned: bool,

    #[command(flatten)]
    pub sync: SyncArgs,
}

/// Execute the download command
pub async fn execute(args: DownloadArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output);

    let target = if args.memory {
        DownloadTarget::Memory
    } else {
        match &args.output {
            Some(dir) => DownloadTarget::Filesystem(dir.clone()),
            None => DownloadTarget::default_dir(&args.bucket),
        }
    };

    let client = match connect(ctx, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let mut options = args.sync.options(&ctx.settings);
    if args.presigned {
        options = options.with_download_strategy(DownloadStrategy::Presigned);
    }

    let total = (!args.keys.is_empty()).then_some(args.keys.len() as u64);
    let progress = Progress::new(&formatter, total, "Downloading");
    let engine = match engine(client, options, ctx, &progress, &formatter) {
        Ok(e) => e,
        Err(code) => return code,
    };

    let result = engine
        .download(&args.bucket, &args.keys, &args.prefix, &target)
        .await;
    progress.finish();

    let download = match result {
        Ok(d) => d,
        Err(e) => {
            formatter.error(&format!("Download failed: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let code = finish_report(&download.report, &formatter);

    match &target {
        DownloadTarget::Memory => {
            // Stdout carries only the report in JSON mode
            if !formatter.is_json() {
                let total: usize = download.objects.values().map(|b| b.len()).sum();
                formatter.println(&format!(
                    "Held {} object(s) in memory ({})",
                    download.objects.len(),
                    formatter.style_size(&humansize::format_size(total, humansize::BINARY))
                ));
            }
        }
        DownloadTarget::Filesystem(dir) => {
            if download.report.summary().success > 0 {
                formatter.success(&format!("Saved to {}", dir.display()));
            }
        }
    }

    code
}
