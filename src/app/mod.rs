//! Main application modules.
//!
//! This module provides the line ingest loop, progress logging and shutdown
//! handling used by the `proxy_stat` binary.

pub mod ingest;
pub mod logging;
pub mod shutdown;

// Re-export public API
pub use ingest::{ingest_lines, IngestSummary};
pub use logging::log_progress;
pub use shutdown::{shutdown_gracefully, spawn_interrupt_listener};
