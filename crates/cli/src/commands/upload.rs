//! upload command - Send local files to a bucket

use std::path::PathBuf;

use clap::Args;

use super::{Context, SyncArgs, connect, engine, finish_report};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, Progress};

/// Upload local files into a bucket
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Files or glob patterns (e.g. "runs/*.csv")
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Destination bucket
    #[arg(short, long)]
    pub bucket: String,

    /// Key prefix for the uploaded files
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    #[command(flatten)]
    pub sync: SyncArgs,
}

/// Execute the upload command
pub async fn execute(args: UploadArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output);

    let files = match expand_paths(&args.files) {
        Ok(files) => files,
        Err(e) => {
            formatter.error(&e);
            return ExitCode::UsageError;
        }
    };

    let client = match connect(ctx, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let progress = Progress::new(&formatter, Some(files.len() as u64), "Uploading");
    let engine = match engine(
        client,
        args.sync.options(&ctx.settings),
        ctx,
        &progress,
        &formatter,
    ) {
        Ok(e) => e,
        Err(code) => return code,
    };

    let result = engine.upload(&files, &args.bucket, &args.prefix).await;
    progress.finish();

    match result {
        Ok(report) => finish_report(&report, &formatter),
        Err(e) => {
            formatter.error(&format!("Upload failed: {e}"));
            ExitCode::from_error(&e)
        }
    }
}

/// Expand glob patterns; plain paths pass through even when they do not exist
///
/// A missing plain path is reported as `missing` by the engine. A pattern
/// that matches nothing contributes no files.
fn expand_paths(patterns: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();

    for pattern in patterns {
        if !is_glob(pattern) {
            files.push(PathBuf::from(pattern));
            continue;
        }

        let matches =
            glob::glob(pattern).map_err(|e| format!("Invalid pattern '{pattern}': {e}"))?;
        let before = files.len();
        for entry in matches {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!(pattern = %pattern, error = %e, "Unreadable glob match"),
            }
        }
        if files.len() == before {
            tracing::warn!(pattern = %pattern, "Pattern matched no files");
        }
    }

    Ok(files)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}
