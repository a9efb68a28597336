//! ClickHouse DDL and insert statement construction.

/// Local table every row lands in.
pub const TABLE: &str = "proxy_stat";

/// Distributed table routing over `TABLE` in replicated mode.
pub const DISTRIBUTED_TABLE: &str = "proxy_stat_all";

/// Row retention enforced by the table TTL.
pub const RETENTION: &str = "3 MONTH";

const CLUSTER: &str = "'{cluster}'";
const REPLICATED_ENGINE: &str = "ReplicatedMergeTree('/clickhouse/{installation}/{cluster}/tables/{shard}/{database}/{table}', '{replica}')";
const LOCAL_ENGINE: &str = "MergeTree()";

/// Insert columns in bind order. `node` is supplied by the writer.
pub const COLUMNS: [&str; 18] = [
    "timestamp",
    "api_key",
    "client",
    "bytes_written",
    "ttfb",
    "duration",
    "path",
    "infohash",
    "original_path",
    "session_id",
    "domain",
    "status",
    "grouped_status",
    "edge",
    "source",
    "role",
    "ads",
    "node",
];

/// Returns the DDL statements that provision the schema, in execution order.
///
/// Every statement is `CREATE TABLE IF NOT EXISTS`, so running them against
/// an already provisioned store is harmless.
pub fn create_table_statements(replicated: bool) -> Vec<String> {
    let (table_expr, engine) = if replicated {
        (format!("{TABLE} ON CLUSTER {CLUSTER}"), REPLICATED_ENGINE)
    } else {
        (TABLE.to_string(), LOCAL_ENGINE)
    };

    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {table_expr} (
    timestamp      DateTime,
    api_key        String,
    client         String,
    bytes_written  UInt64,
    ttfb           UInt32,
    duration       UInt32,
    path           String,
    infohash       String,
    original_path  String,
    session_id     String,
    domain         String,
    status         UInt16,
    grouped_status UInt16,
    edge           String,
    source         String,
    role           String,
    ads            UInt8,
    node           String
) ENGINE = {engine}
PARTITION BY toYYYYMM(timestamp)
ORDER BY (timestamp)
TTL timestamp + INTERVAL {RETENTION}"
    )];

    if replicated {
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {DISTRIBUTED_TABLE} ON CLUSTER {CLUSTER} AS {TABLE}
ENGINE = Distributed({CLUSTER}, default, {TABLE}, rand())"
        ));
    }

    statements
}

/// Table inserts are written to.
pub fn target_table(replicated: bool) -> &'static str {
    if replicated {
        DISTRIBUTED_TABLE
    } else {
        TABLE
    }
}

/// Parameterized insert for one row.
pub fn insert_statement(replicated: bool) -> String {
    let placeholders = vec!["?"; COLUMNS.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        target_table(replicated),
        COLUMNS.join(", "),
        placeholders
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_schema_is_single_merge_tree() {
        let statements = create_table_statements(false);
        assert_eq!(statements.len(), 1);
        let ddl = &statements[0];
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS proxy_stat ("));
        assert!(ddl.contains("ENGINE = MergeTree()"));
        assert!(!ddl.contains("ON CLUSTER"));
        assert!(ddl.contains("PARTITION BY toYYYYMM(timestamp)"));
        assert!(ddl.contains("ORDER BY (timestamp)"));
        assert!(ddl.ends_with("TTL timestamp + INTERVAL 3 MONTH"));
    }

    #[test]
    fn test_replicated_schema_adds_distributed_table() {
        let statements = create_table_statements(true);
        assert_eq!(statements.len(), 2);
        assert!(statements[0]
            .starts_with("CREATE TABLE IF NOT EXISTS proxy_stat ON CLUSTER '{cluster}' ("));
        assert!(statements[0].contains(
            "ENGINE = ReplicatedMergeTree('/clickhouse/{installation}/{cluster}/tables/{shard}/{database}/{table}', '{replica}')"
        ));
        assert!(statements[1]
            .starts_with("CREATE TABLE IF NOT EXISTS proxy_stat_all ON CLUSTER '{cluster}' AS proxy_stat"));
        assert!(statements[1].contains("Distributed('{cluster}', default, proxy_stat, rand())"));
    }

    #[test]
    fn test_schema_declares_every_insert_column() {
        let ddl = &create_table_statements(false)[0];
        for column in COLUMNS {
            assert!(
                ddl.lines().any(|l| l.trim_start().starts_with(&format!("{column} "))),
                "column {column} missing from DDL"
            );
        }
    }

    #[test]
    fn test_insert_targets_depend_on_replication() {
        assert_eq!(target_table(false), "proxy_stat");
        assert_eq!(target_table(true), "proxy_stat_all");

        let local = insert_statement(false);
        assert!(local.starts_with("INSERT INTO proxy_stat (timestamp, api_key, client,"));
        assert!(local.ends_with("ads, node) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"));
        assert!(insert_statement(true).starts_with("INSERT INTO proxy_stat_all ("));
    }
}
