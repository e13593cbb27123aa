//! share command - Generate presigned URLs
//!
//! Creates time-limited URLs for fetching objects without credentials.

use std::time::Duration;

use clap::Args;
use osn_core::ObjectStore as _;
use osn_core::config::MAX_PRESIGN_TTL_SECS;
use serde::Serialize;

use super::{Context, connect};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Generate a presigned download URL for an object
#[derive(Args, Debug)]
pub struct ShareArgs {
    /// Bucket holding the object
    #[arg(short, long)]
    pub bucket: String,

    /// Object key
    #[arg(short, long)]
    pub key: String,

    /// Expiration time (e.g. 30m, 1h, 7d). Default: presign_ttl_secs setting
    #[arg(short, long)]
    pub expire: Option<String>,
}

#[derive(Debug, Serialize)]
struct ShareOutput {
    url: String,
    bucket: String,
    key: String,
    expires_in: String,
    expires_secs: u64,
}

/// Execute the share command
pub async fn execute(args: ShareArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output);

    if args.key.is_empty() || args.key.ends_with('/') {
        formatter.error("Object key is required and cannot be a folder");
        return ExitCode::UsageError;
    }

    let expires_secs = match &args.expire {
        Some(expire) => match parse_expiration(expire) {
            Ok(secs) => secs,
            Err(e) => {
                formatter.error(&e);
                return ExitCode::UsageError;
            }
        },
        None => ctx.settings.sync.presign_ttl_secs,
    };

    if expires_secs == 0 || expires_secs > MAX_PRESIGN_TTL_SECS {
        formatter.error(&format!(
            "Expiration must be between 1 second and 7 days ({MAX_PRESIGN_TTL_SECS} seconds)"
        ));
        return ExitCode::UsageError;
    }

    let client = match connect(ctx, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let url = match client
        .presign_get(&args.bucket, &args.key, Duration::from_secs(expires_secs))
        .await
    {
        Ok(url) => url,
        Err(e) => {
            formatter.error(&format!("Failed to generate download URL: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let expires_human = format_duration(expires_secs);

    if formatter.is_json() {
        formatter.json(&ShareOutput {
            url,
            bucket: args.bucket,
            key: args.key,
            expires_in: expires_human,
            expires_secs,
        });
    } else {
        formatter.println(&formatter.style_url(&url));
        formatter.println("");
        formatter.println(&format!("Expires in: {expires_human}"));
    }

    ExitCode::Success
}

/// Parse expiration string (e.g., "90", "30m", "1h", "7d")
fn parse_expiration(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Expiration cannot be empty".to_string());
    }

    let (num_str, suffix) = if s.ends_with(|c: char| c.is_ascii_alphabetic()) {
        let idx = s.len() - 1;
        (&s[..idx], &s[idx..])
    } else {
        (s, "s")
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("Invalid expiration number: {num_str}"))?;

    let unit = match suffix.to_lowercase().as_str() {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        "w" => 604_800,
        _ => return Err(format!("Unknown expiration suffix: {suffix}")),
    };

    num.checked_mul(unit)
        .ok_or_else(|| format!("Expiration is too large: {s}"))
}

/// Format duration in human-readable form
fn format_duration(secs: u64) -> String {
    if secs >= 86400 {
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        if hours > 0 {
            format!("{days}d {hours}h")
        } else {
            format!("{days} day(s)")
        }
    } else if secs >= 3600 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{hours}h {mins}m")
        } else {
            format!("{hours} hour(s)")
        }
    } else if secs >= 60 {
        format!("{} minute(s)", secs / 60)
    } else {
        format!("{secs} second(s)")
    }
}
