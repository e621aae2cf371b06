//! CLI entry point for the response mapper.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use response_mapper::transport::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use response_mapper::{FetchClient, MapperConfig, purge_spooled_files};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::{FileConfig, load_file_config};
use cli::Args;

/// Removes any spool files still on disk when `main` returns.
struct SpoolCleanup;

impl Drop for SpoolCleanup {
    fn drop(&mut self) {
        let removed = purge_spooled_files();
        if removed > 0 {
            debug!(removed, "purged spool files on exit");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries the JSON descriptor only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = load_file_config(args.config.as_deref())?.unwrap_or_default();
    let settings = Settings::merge(&args, &file_config);
    debug!(?settings, "effective settings");

    let _cleanup = SpoolCleanup;

    let client = FetchClient::with_timeouts(
        settings.mapper.clone(),
        settings.connect_timeout_secs,
        settings.read_timeout_secs,
    )
    .context("Failed to build HTTP client")?;

    let fetch = async {
        client
            .fetch(&args.method, &args.url)
            .await
            .with_context(|| format!("Failed to map response from {}", args.url))
    };
    let descriptor = run_interruptible(fetch, ctrl_c_or_never()).await?;

    if let Some(output) = &args.output {
        let mut file = tokio::fs::File::create(output)
            .await
            .with_context(|| format!("Failed to create output file '{}'", output.display()))?;
        let written = descriptor
            .body_source()
            .copy_to(&mut file)
            .await
            .with_context(|| format!("Failed to write body to '{}'", output.display()))?;
        file.flush().await?;
        info!(path = %output.display(), bytes = written, "body written");
    }

    let json = if args.compact {
        serde_json::to_string(&descriptor)?
    } else {
        serde_json::to_string_pretty(&descriptor)?
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").context("Failed to write descriptor to stdout")?;

    if !(200..300).contains(&descriptor.status()) {
        warn!(status = descriptor.status(), "non-success status");
    }

    Ok(())
}

/// Runs `work` unless `interrupt` completes first.
///
/// On interrupt the in-flight work is dropped, every spool file still on disk
/// is purged, and an error is returned so the process exits non-zero.
async fn run_interruptible<T, W, I>(work: W, interrupt: I) -> Result<T>
where
    W: Future<Output = Result<T>>,
    I: Future<Output = ()>,
{
    tokio::select! {
        output = work => output,
        () = interrupt => {
            let removed = purge_spooled_files();
            warn!(removed, "interrupted, spool files removed");
            anyhow::bail!("Interrupted before the response was mapped")
        }
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn ctrl_c_or_never() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Effective settings after layering CLI flags over the config file over defaults.
#[derive(Debug)]
struct Settings {
    mapper: MapperConfig,
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
}

impl Settings {
    fn merge(args: &Args, file: &FileConfig) -> Self {
        let mut mapper = MapperConfig::default();
        if let Some(limit) = args.max_in_memory.or(file.max_in_memory_body_bytes) {
            mapper.max_in_memory_body_bytes = limit;
        }
        mapper.spool_dir = args.spool_dir.clone().or_else(|| file.spool_dir.clone());

        Self {
            mapper,
            connect_timeout_secs: args
                .connect_timeout
                .or(file.connect_timeout_secs)
                .unwrap_or(CONNECT_TIMEOUT_SECS),
            read_timeout_secs: args
                .read_timeout
                .or(file.read_timeout_secs)
                .unwrap_or(READ_TIMEOUT_SECS),
        }
    }
}
