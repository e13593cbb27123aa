//! ls command - List buckets or keys

use clap::Args;
use osn_core::ObjectStoreExt as _;
use serde::Serialize;

use super::{Context, connect};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// List buckets, or the keys of one bucket
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Bucket to list; lists all buckets when omitted
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Only keys under this prefix
    #[arg(short, long, default_value = "")]
    pub prefix: String,
}

#[derive(Debug, Serialize)]
struct BucketsOutput {
    buckets: Vec<String>,
}

#[derive(Debug, Serialize)]
struct KeysOutput {
    bucket: String,
    prefix: String,
    keys: Vec<String>,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output);

    let client = match connect(ctx, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let Some(bucket) = args.bucket else {
        return match client.list_buckets().await {
            Ok(buckets) => {
                if formatter.is_json() {
                    formatter.json(&BucketsOutput { buckets });
                } else {
                    for bucket in &buckets {
                        formatter.println(&formatter.style_name(bucket));
                    }
                }
                ExitCode::Success
            }
            Err(e) => {
                formatter.error(&format!("Failed to list buckets: {e}"));
                ExitCode::from_error(&e)
            }
        };
    };

    match client.collect_keys(&bucket, &args.prefix).await {
        Ok(keys) => {
            if formatter.is_json() {
                formatter.json(&KeysOutput {
                    bucket,
                    prefix: args.prefix,
                    keys,
                });
            } else {
                for key in &keys {
                    formatter.println(key);
                }
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to list {bucket}: {e}"));
            ExitCode::from_error(&e)
        }
    }
}
