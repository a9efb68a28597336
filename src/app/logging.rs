//! Progress logging utilities.

use std::time::Instant;

use log::info;

use crate::error_handling::FlushStatsSnapshot;

/// Logs ingest throughput and flush totals so far.
pub fn log_progress(start_time: Instant, stats: &FlushStatsSnapshot, pending: usize) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let rate = if elapsed_secs > 0.0 {
        stats.records_added as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Accepted {} records in {:.2} seconds (~{:.2} records/sec); stored {}, dropped {}, pending {}",
        stats.records_added, elapsed_secs, rate, stats.records_flushed, stats.records_dropped, pending
    );
}
