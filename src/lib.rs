//! proxy_stat library: telemetry ingestion for the torrent HTTP proxy
//!
//! Request handlers hand a [`TelemetryRecord`] to a shared [`BatchWriter`]
//! when a proxied request completes. The writer buffers records, hands full
//! batches to a background flush task and writes each batch to ClickHouse in
//! one transaction, creating the `proxy_stat` schema on first use. Producers
//! never wait on the store.
//!
//! The crate also provides [`BroadcastGate`], the one-shot release signal
//! the proxy's resource locks use to wake every task waiting on a resource.
//!
//! # Example
//!
//! ```no_run
//! use proxy_stat::{BatchWriter, SqlxProvider, TelemetryRecord, WriterConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = SqlxProvider::connect_lazy("mysql://default@localhost:9004/default", 4)?;
//! let writer = BatchWriter::new(
//!     provider,
//!     WriterConfig {
//!         node_name: "edge-1".to_string(),
//!         ..Default::default()
//!     },
//! )?;
//!
//! writer.add(TelemetryRecord {
//!     path: "/08ada5a7/video.mp4".to_string(),
//!     status: 200,
//!     ..Default::default()
//! })?;
//!
//! writer.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! `BatchWriter::new` must be called inside a Tokio runtime; it spawns the
//! flush task there.

#![warn(missing_docs)]

pub mod app;
pub mod config;
mod error_handling;
pub mod initialization;
pub mod storage;
pub mod sync;

// Re-export public API
pub use config::{LogFormat, LogLevel, Opt};
pub use error_handling::{
    FlushError, FlushStats, FlushStatsSnapshot, FlushStep, GateError, InitializationError,
    StoreError, WriterError,
};
pub use run::{run_ingest, IngestReport};
pub use storage::{
    BatchWriter, SqlxProvider, StoreHandle, StoreProvider, StoreTransaction, TelemetryRecord,
    Value, WriterConfig,
};
pub use sync::{BroadcastGate, WaitHandle};

// Internal run module (wires the binary's pieces together)
mod run {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use anyhow::{Context, Result};
    use log::info;
    use tokio::io::{AsyncBufRead, BufReader};
    use tokio_util::sync::CancellationToken;

    use crate::app::{
        ingest_lines, log_progress, shutdown_gracefully, spawn_interrupt_listener, IngestSummary,
    };
    use crate::config::{Opt, LOGGING_INTERVAL};
    use crate::error_handling::FlushStatsSnapshot;
    use crate::initialization::{init_store_provider, init_writer};

    /// Results of one ingest run.
    #[derive(Debug, Clone)]
    pub struct IngestReport {
        /// Line counts from the input
        pub input: IngestSummary,
        /// Writer counters after the final flush
        pub stats: FlushStatsSnapshot,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Streams records from `opt.input` into ClickHouse.
    ///
    /// Runs until end of input or Ctrl-C, then closes the writer, which
    /// flushes every buffered record before returning.
    ///
    /// # Errors
    ///
    /// Fails if the input cannot be opened or read, the pool cannot be
    /// configured, or the final flush fails.
    pub async fn run_ingest(opt: Opt) -> Result<IngestReport> {
        let start_time = Instant::now();

        let provider = init_store_provider(&opt)?;
        let writer = Arc::new(init_writer(&opt, provider)?);

        let reader: Box<dyn AsyncBufRead + Unpin + Send> = if opt.input.as_os_str() == "-" {
            info!("Reading records from stdin");
            Box::new(BufReader::new(tokio::io::stdin()))
        } else {
            let file = tokio::fs::File::open(&opt.input)
                .await
                .with_context(|| format!("Failed to open input file {}", opt.input.display()))?;
            Box::new(BufReader::new(file))
        };

        let cancel = CancellationToken::new();
        let interrupt_listener = spawn_interrupt_listener(cancel.clone());

        let cancel_logging = cancel.child_token();
        let progress = Arc::clone(&writer);
        let logging_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(LOGGING_INTERVAL));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        log_progress(start_time, &progress.stats(), progress.pending_len());
                    }
                    _ = cancel_logging.cancelled() => {
                        break;
                    }
                }
            }
        }));

        let ingest_result = ingest_lines(reader, &writer, &cancel).await;

        shutdown_gracefully(cancel, logging_task, interrupt_listener).await;

        // Flush whatever was accepted even if input failed part way.
        let close_result = writer
            .close()
            .await
            .context("Failed to flush remaining records to ClickHouse");
        let input = ingest_result?;
        close_result?;

        let stats = writer.stats();
        log_progress(start_time, &stats, 0);

        Ok(IngestReport {
            input,
            stats,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }
}
