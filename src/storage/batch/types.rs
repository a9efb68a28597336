//! Telemetry record and writer configuration.
//!
//! This module defines the `TelemetryRecord` produced by the proxy request
//! handler and the `WriterConfig` a `BatchWriter` is built from.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_BATCH_SIZE;
use crate::storage::provider::Value;

/// Outcome of one completed proxied request.
///
/// Created by the request handler when the response finishes and never
/// mutated afterwards. Ownership moves to the writer on `add`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryRecord {
    /// When the request completed
    pub timestamp: DateTime<Utc>,
    /// API key the request was made with
    pub api_key: String,
    /// Client identifier
    pub client: String,
    /// Response bytes sent to the client
    pub bytes_written: u64,
    /// Time to first byte in milliseconds
    pub ttfb: u64,
    /// Total duration in milliseconds
    pub duration: u64,
    /// Request path as served
    pub path: String,
    /// Torrent info hash, stored in the `infohash` column
    pub info_hash: String,
    /// Request path before any rewrite
    pub original_path: String,
    /// Client session identifier
    pub session_id: String,
    /// Host the request was addressed to
    pub domain: String,
    /// HTTP status code
    pub status: u64,
    /// Coarse status bucket (e.g. 200, 400, 500)
    pub grouped_status: u64,
    /// Edge location that served the request
    pub edge: String,
    /// Where the request originated
    pub source: String,
    /// Role of the requesting client
    pub role: String,
    /// Whether ads were served with the response
    pub ads: bool,
}

impl TelemetryRecord {
    /// Normalizes the record into one insert row tagged with `node`.
    ///
    /// Values follow `schema::COLUMNS` order. Counters wider than their
    /// column saturate instead of wrapping.
    pub fn to_row(&self, node: &str) -> Vec<Value> {
        vec![
            Value::DateTime(self.timestamp),
            Value::String(self.api_key.clone()),
            Value::String(self.client.clone()),
            Value::UInt64(self.bytes_written),
            Value::UInt32(saturate_u32(self.ttfb)),
            Value::UInt32(saturate_u32(self.duration)),
            Value::String(self.path.clone()),
            Value::String(self.info_hash.clone()),
            Value::String(self.original_path.clone()),
            Value::String(self.session_id.clone()),
            Value::String(self.domain.clone()),
            Value::UInt16(saturate_u16(self.status)),
            Value::UInt16(saturate_u16(self.grouped_status)),
            Value::String(self.edge.clone()),
            Value::String(self.source.clone()),
            Value::String(self.role.clone()),
            Value::UInt8(u8::from(self.ads)),
            Value::String(node.to_string()),
        ]
    }
}

fn saturate_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

fn saturate_u16(v: u64) -> u16 {
    u16::try_from(v).unwrap_or(u16::MAX)
}

/// Configuration for a `BatchWriter`.
///
/// Built once from process configuration and baked into the writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Number of records that triggers an asynchronous flush
    pub batch_size: usize,
    /// Use the cluster-replicated engine and write through the distributed table
    pub replicated: bool,
    /// Node identifier attached to every row at write time
    pub node_name: String,
    /// Flush a partial batch after this long (disabled when `None`)
    pub flush_interval: Option<Duration>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            replicated: false,
            node_name: String::new(),
            flush_interval: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::COLUMNS;
    use chrono::TimeZone;

    fn sample() -> TelemetryRecord {
        TelemetryRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            api_key: "key".into(),
            client: "client-1".into(),
            bytes_written: 10_000_000_000,
            ttfb: 42,
            duration: 1500,
            path: "/abc/file.mp4".into(),
            info_hash: "08ada5a7a6183aae1e09d831df6748d566095a10".into(),
            original_path: "/file.mp4".into(),
            session_id: "sess".into(),
            domain: "example.com".into(),
            status: 206,
            grouped_status: 200,
            edge: "fra1".into(),
            source: "web".into(),
            role: "viewer".into(),
            ads: true,
        }
    }

    #[test]
    fn test_to_row_matches_column_order() {
        let row = sample().to_row("node-a");
        assert_eq!(row.len(), COLUMNS.len());
        assert_eq!(row[3], Value::UInt64(10_000_000_000));
        assert_eq!(row[4], Value::UInt32(42));
        assert_eq!(row[7], Value::String("08ada5a7a6183aae1e09d831df6748d566095a10".into()));
        assert_eq!(row[11], Value::UInt16(206));
        assert_eq!(row[12], Value::UInt16(200));
        assert_eq!(row[17], Value::String("node-a".into()));
    }

    #[test]
    fn test_to_row_normalizes_bool_to_uint8() {
        let mut record = sample();
        assert_eq!(record.to_row("")[16], Value::UInt8(1));
        record.ads = false;
        assert_eq!(record.to_row("")[16], Value::UInt8(0));
    }

    #[test]
    fn test_to_row_saturates_narrow_columns() {
        let record = TelemetryRecord {
            ttfb: u64::MAX,
            duration: u64::from(u32::MAX) + 1,
            status: 70_000,
            ..Default::default()
        };
        let row = record.to_row("n");
        assert_eq!(row[4], Value::UInt32(u32::MAX));
        assert_eq!(row[5], Value::UInt32(u32::MAX));
        assert_eq!(row[11], Value::UInt16(u16::MAX));
    }

    #[test]
    fn test_record_deserializes_with_missing_fields() {
        let record: TelemetryRecord = serde_json::from_str(
            r#"{"timestamp":"2024-03-01T12:00:00Z","path":"/x","status":200,"ads":true}"#,
        )
        .unwrap();
        assert_eq!(record.path, "/x");
        assert_eq!(record.status, 200);
        assert!(record.ads);
        assert_eq!(record.api_key, "");
    }

    #[test]
    fn test_writer_config_default() {
        let config = WriterConfig::default();
        assert_eq!(config.batch_size, 1000);
        assert!(!config.replicated);
        assert!(config.node_name.is_empty());
        assert!(config.flush_interval.is_none());
    }
}
