//! transfer command - Copy a bucket's objects to another endpoint

use std::path::PathBuf;

use clap::Args;

use super::{
    Context, SyncArgs, connect, connect_with, engine, finish_report, load_credentials,
};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, Progress};

/// Copy objects from one bucket to another, possibly on another endpoint
#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Source bucket (read with the main credentials)
    #[arg(short, long)]
    pub bucket: String,

    /// Destination bucket
    #[arg(long)]
    pub dest_bucket: String,

    /// Credentials file for the destination endpoint
    #[arg(long)]
    pub dest_credentials: PathBuf,

    /// Only copy keys under this prefix
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    #[command(flatten)]
    pub sync: SyncArgs,
}

/// Execute the transfer command
pub async fn execute(args: TransferArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output);

    let source = match connect(ctx, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let dest_credentials =
        match load_credentials(Some(&args.dest_credentials), &ctx.settings, &formatter) {
            Ok(c) => c,
            Err(code) => return code,
        };
    let dest = match connect_with(&dest_credentials, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let progress = Progress::new(&formatter, None, "Transferring");
    let engine = match engine(
        source,
        args.sync.options(&ctx.settings),
        ctx,
        &progress,
        &formatter,
    ) {
        Ok(e) => e,
        Err(code) => return code,
    };

    let result = engine
        .transfer(&args.bucket, dest.as_ref(), &args.dest_bucket, &args.prefix)
        .await;
    progress.finish();

    match result {
        Ok(report) => finish_report(&report, &formatter),
        Err(e) => {
            formatter.error(&format!("Transfer failed: {e}"));
            ExitCode::from_error(&e)
        }
    }
}
