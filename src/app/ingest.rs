//! Newline-delimited JSON ingest.

use anyhow::{Context, Result};
use log::{debug, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use crate::storage::{BatchWriter, StoreProvider, TelemetryRecord};

/// Counts from one pass over the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Non-blank lines read
    pub lines: usize,
    /// Records handed to the writer
    pub accepted: usize,
    /// Lines that did not parse as a record
    pub malformed: usize,
    /// Input stopped early because `cancel` fired
    pub interrupted: bool,
}

/// Reads one JSON `TelemetryRecord` per line and adds it to `writer`.
///
/// Blank lines are ignored. Malformed lines, including ones that are not
/// valid UTF-8, are logged and skipped. Stops at end of input or when
/// `cancel` fires; the writer is left open.
///
/// # Errors
///
/// Fails if the input cannot be read or the writer refuses a record
/// (closed, or its flush worker died).
pub async fn ingest_lines<R, P>(
    mut reader: R,
    writer: &BatchWriter<P>,
    cancel: &CancellationToken,
) -> Result<IngestSummary>
where
    R: AsyncBufRead + Unpin,
    P: StoreProvider,
{
    let mut summary = IngestSummary::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let read = tokio::select! {
            _ = cancel.cancelled() => {
                summary.interrupted = true;
                break;
            }
            read = reader.read_until(b'\n', &mut buf) => read.context("Failed to read input")?,
        };
        if read == 0 {
            break;
        }

        line_no += 1;
        let trimmed = buf.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }
        summary.lines += 1;

        // Decoding bytes directly also rejects invalid UTF-8 per line.
        match serde_json::from_slice::<TelemetryRecord>(trimmed) {
            Ok(record) => {
                writer
                    .add(record)
                    .context("ClickHouse writer rejected record")?;
                summary.accepted += 1;
            }
            Err(e) => {
                summary.malformed += 1;
                warn!("Skipping malformed record on line {}: {e}", line_no);
            }
        }
    }

    debug!("Ingest finished: {:?}", summary);
    Ok(summary)
}
