//! Configuration constants.
//!
//! Defaults for the writer and the store pool.

use std::time::Duration;

/// Records per flush unless overridden by `CLICKHOUSE_BATCH_SIZE`.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Upper bound on pooled store connections.
/// Flushes are serialized, so one connection is busy at a time; the rest
/// only absorb ping/insert overlap across reconnects.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// How long a flush waits for a pooled connection before failing.
pub const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between progress log lines in the ingest binary (seconds).
pub const LOGGING_INTERVAL: u64 = 5;
