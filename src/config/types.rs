//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration. Every writer setting can also come from the environment,
//! which is how the proxy's deployment manifests set them.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONNECTIONS};
use crate::storage::WriterConfig;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Command-line options and configuration.
///
/// # Examples
///
/// ```bash
/// # Stream newline-delimited JSON records from stdin
/// proxy_stat --clickhouse-dsn mysql://default@localhost:9004/default < stats.jsonl
///
/// # Replicated cluster, configured from the environment
/// CLICKHOUSE_REPLICATED=true MY_NODE_NAME=edge-3 proxy_stat stats.jsonl
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "proxy_stat",
    about = "Streams proxy request telemetry into ClickHouse in batches."
)]
pub struct Opt {
    /// File with one JSON record per line (`-` for stdin)
    #[arg(value_parser, default_value = "-")]
    pub input: PathBuf,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// ClickHouse MySQL-interface URL
    #[arg(
        long,
        env = "CLICKHOUSE_DSN",
        default_value = "mysql://default@localhost:9004/default"
    )]
    pub clickhouse_dsn: String,

    /// ClickHouse batch size
    #[arg(long, env = "CLICKHOUSE_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub clickhouse_batch_size: usize,

    /// ClickHouse replication enabled
    #[arg(long, env = "CLICKHOUSE_REPLICATED")]
    pub clickhouse_replicated: bool,

    /// Maximum pooled ClickHouse connections
    #[arg(long, env = "CLICKHOUSE_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub clickhouse_max_connections: u32,

    /// Node name attached to every stored row
    #[arg(long, env = "MY_NODE_NAME", default_value = "")]
    pub my_node_name: String,

    /// Flush a partial batch after this many seconds (0 disables)
    #[arg(long, env = "CLICKHOUSE_FLUSH_INTERVAL", default_value_t = 0)]
    pub flush_interval_secs: u64,
}

impl Opt {
    /// Writer settings derived from the options.
    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            batch_size: self.clickhouse_batch_size,
            replicated: self.clickhouse_replicated,
            node_name: self.my_node_name.clone(),
            flush_interval: (self.flush_interval_secs > 0)
                .then(|| Duration::from_secs(self.flush_interval_secs)),
        }
    }
}
