//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - Logger
//! - Store provider
//! - Batch writer
//!
//! All initialization functions return proper error types for error handling.

mod logger;

use anyhow::{Context, Result};

use crate::config::Opt;
use crate::storage::{BatchWriter, SqlxProvider};

// Re-export public API
pub use logger::init_logger_with;

/// Builds the sqlx-backed store provider described by `opt`.
///
/// The pool connects lazily, so this only fails on a malformed DSN.
pub fn init_store_provider(opt: &Opt) -> Result<SqlxProvider> {
    SqlxProvider::connect_lazy(&opt.clickhouse_dsn, opt.clickhouse_max_connections)
        .context("Failed to configure ClickHouse pool")
}

/// Creates the batch writer on the current Tokio runtime.
pub fn init_writer(opt: &Opt, provider: SqlxProvider) -> Result<BatchWriter<SqlxProvider>> {
    let config = opt.writer_config();
    log::info!(
        "ClickHouse writer: batch size {}, replicated {}, node '{}'",
        config.batch_size,
        config.replicated,
        config.node_name
    );
    BatchWriter::new(provider, config).context("Failed to create ClickHouse writer")
}
