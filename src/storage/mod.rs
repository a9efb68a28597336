//! Telemetry persistence: batching, schema and store adapters.

pub mod batch;
pub mod pool;
pub mod provider;
pub mod schema;

// Re-export commonly used items
pub use batch::{BatchWriter, TelemetryRecord, WriterConfig};
pub use pool::{SqlxProvider, SqlxTransaction};
pub use provider::{StoreHandle, StoreProvider, StoreTransaction, Value};
