//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `proxy_stat` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use proxy_stat::initialization::init_logger_with;
use proxy_stat::{run_ingest, Opt};

#[tokio::main]
async fn main() -> Result<()> {
    // Deployment sets CLICKHOUSE_* and MY_NODE_NAME; a local .env is for development
    let _ = dotenvy::dotenv();

    let opt = Opt::parse();

    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    match run_ingest(opt).await {
        Ok(report) => {
            println!(
                "Stored {} of {} record{} in {} batch{} ({} malformed line{}, {} dropped) in {:.1}s{}",
                report.stats.records_flushed,
                report.input.accepted,
                if report.input.accepted == 1 { "" } else { "s" },
                report.stats.batches_flushed,
                if report.stats.batches_flushed == 1 { "" } else { "es" },
                report.input.malformed,
                if report.input.malformed == 1 { "" } else { "s" },
                report.stats.records_dropped,
                report.elapsed_seconds,
                if report.input.interrupted { " (interrupted)" } else { "" }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("proxy_stat error: {:#}", e);
            process::exit(1);
        }
    }
}
