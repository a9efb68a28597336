//! Error handling and flush statistics.
//!
//! This module provides:
//! - Error type definitions for the writer, the store adapter and the gate
//! - The `FlushStep` tag attached to every flush failure
//! - Thread-safe flush statistics
//!
//! Errors fall into three groups:
//! - **Configuration faults**: returned synchronously from construction or `add`
//! - **Store faults**: returned from a flush, wrapped with the failing step
//! - **Provisioning faults**: same as store faults, never retried

mod stats;
mod types;

// Re-export public API
pub use stats::{FlushStats, FlushStatsSnapshot};
pub use types::{
    FlushError, FlushStep, GateError, InitializationError, StoreError, WriterError,
};

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_flush_stats_initialization() {
        let stats = FlushStats::new();
        for step in FlushStep::iter() {
            assert_eq!(stats.step_failure_count(step), 0);
        }
        assert_eq!(stats.snapshot(), FlushStatsSnapshot::default());
    }

    #[test]
    fn test_flush_stats_counts_success_and_failure() {
        let stats = FlushStats::new();
        stats.record_added();
        stats.record_added();
        stats.record_flushed(2);
        stats.record_failed(FlushStep::Ping, 5);
        stats.record_failed(FlushStep::Ping, 3);
        stats.record_failed(FlushStep::Commit, 1);

        let snap = stats.snapshot();
        assert_eq!(snap.records_added, 2);
        assert_eq!(snap.batches_flushed, 1);
        assert_eq!(snap.records_flushed, 2);
        assert_eq!(snap.batches_failed, 3);
        assert_eq!(snap.records_dropped, 9);
        assert_eq!(stats.step_failure_count(FlushStep::Ping), 2);
        assert_eq!(stats.step_failure_count(FlushStep::Commit), 1);
        assert_eq!(stats.total_step_failures(), 3);

        stats.record_lost(4);
        let snap = stats.snapshot();
        assert_eq!(snap.records_dropped, 13);
        assert_eq!(snap.batches_failed, 3);
    }

    #[test]
    fn test_flush_error_message_names_step() {
        let err = FlushError {
            step: FlushStep::Connect,
            source: StoreError::Unavailable("connection refused".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Failed to get ClickHouse DB: store unavailable: connection refused"
        );

        let err = FlushError::at(FlushStep::CreateTable)(StoreError::Driver("boom".into()));
        assert_eq!(err.to_string(), "Failed to create table: boom");
    }

    #[test]
    fn test_writer_error_is_transparent_over_flush_error() {
        let err: WriterError = FlushError {
            step: FlushStep::Commit,
            source: StoreError::Driver("lost".into()),
        }
        .into();
        assert_eq!(err.to_string(), "Failed to commit: lost");
        assert!(matches!(err, WriterError::Store(_)));
    }

    #[test]
    fn test_flush_step_display() {
        let rendered: Vec<String> = FlushStep::iter().map(|s| s.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "get ClickHouse DB",
                "create table",
                "ping",
                "begin",
                "prepare",
                "exec",
                "commit"
            ]
        );
    }
}
