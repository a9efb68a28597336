//! Batched telemetry writing.
//!
//! This module defines the `TelemetryRecord` data model, the writer
//! configuration and the `BatchWriter` that hands full batches to an
//! asynchronous flush path.

mod types;
mod writer;

pub use types::{TelemetryRecord, WriterConfig};
pub use writer::BatchWriter;
