//! osn - batched, reported sync between local files and S3-compatible buckets

mod commands;
mod exit_code;
mod output;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use osn_core::{Config, ConfigManager};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::commands::Context;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Batched, reported sync between local files and S3-compatible buckets
#[derive(Parser, Debug)]
#[command(name = "osn", version, about, propagate_version = true)]
pub struct Cli {
    /// Credentials file (JSON). Falls back to the settings file, then OSN_* variables
    #[arg(long, global = true, env = "OSN_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Output JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Only print errors (and the report in JSON mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload local files to a bucket
    Upload(commands::upload::UploadArgs),

    /// Download objects from a bucket
    Download(commands::download::DownloadArgs),

    /// Copy objects from one bucket to another endpoint
    Transfer(commands::transfer::TransferArgs),

    /// List buckets or keys
    Ls(commands::ls::LsArgs),

    /// Generate a presigned URL for an object
    Share(commands::share::ShareArgs),

    /// Generate shell completions
    Completions(commands::completions::CompletionsArgs),
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let output = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };
    let formatter = Formatter::new(output);

    if let Err(e) = init_tracing(cli.debug) {
        formatter.error(&format!("{e:#}"));
        return ExitCode::GeneralError.into();
    }

    run(cli, output, &formatter).await.into()
}

async fn run(cli: Cli, output: OutputConfig, formatter: &Formatter) -> ExitCode {
    let command = match cli.command {
        Commands::Completions(args) => return commands::completions::execute(args),
        command => command,
    };

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::UsageError;
        }
    };

    let ctx = Context {
        output,
        credentials: cli.credentials,
        settings,
        cancel: CancellationToken::new(),
    };
    watch_ctrl_c(ctx.cancel.clone());

    match command {
        Commands::Upload(args) => commands::upload::execute(args, &ctx).await,
        Commands::Download(args) => commands::download::execute(args, &ctx).await,
        Commands::Transfer(args) => commands::transfer::execute(args, &ctx).await,
        Commands::Ls(args) => commands::ls::execute(args, &ctx).await,
        Commands::Share(args) => commands::share::execute(args, &ctx).await,
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Logs go to stderr so JSON on stdout stays parseable
fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let filter = if debug {
        EnvFilter::try_new("warn,osn=debug,osn_core=debug,osn_s3=debug")?
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize logging")
}

fn load_settings() -> anyhow::Result<Config> {
    let manager = ConfigManager::new().context("Failed to locate settings directory")?;
    manager
        .load()
        .with_context(|| format!("Failed to load settings from {}", manager.path().display()))
}

/// Cancel `token` on the first Ctrl-C; in-flight items finish, nothing new starts
fn watch_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after in-flight items");
            token.cancel();
        }
    });
}
