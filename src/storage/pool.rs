//! sqlx-backed store provider.
//!
//! Talks to ClickHouse over its MySQL wire interface through a lazily
//! connected `MySqlPool`:
//! - The pool owns connection limits and acquire timeouts
//! - Session setup skips the MySQL-only `SET sql_mode`, `SET NAMES` and
//!   `SET time_zone` statements, which ClickHouse rejects
//! - Ping checks out a connection and pings it
//! - A "transaction" buffers rows on a checked-out connection and sends them
//!   as multi-row `INSERT`s on commit; ClickHouse inserts each block
//!   atomically, and nothing is sent if the batch is abandoned

use std::str::FromStr;
use std::time::Duration;

use log::info;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::{Arguments, Connection, MySql};

use crate::config::DB_ACQUIRE_TIMEOUT;
use crate::error_handling::{InitializationError, StoreError};

use super::provider::{StoreHandle, StoreProvider, StoreTransaction, Value};

/// Bind parameter limit of one MySQL-protocol statement. Batches wider than
/// this are sent as several inserts.
const MAX_PLACEHOLDERS: usize = 65_535;

/// Connect options for ClickHouse's MySQL interface.
///
/// # Errors
///
/// Returns `StorePoolError` if `dsn` is not a valid `mysql://` URL.
pub fn connect_options(dsn: &str) -> Result<MySqlConnectOptions, InitializationError> {
    let options = MySqlConnectOptions::from_str(dsn)?
        .pipes_as_concat(false)
        .no_engine_substitution(false)
        .set_names(false)
        .timezone(None::<String>);
    Ok(options)
}

/// `StoreProvider` over a sqlx MySQL pool.
#[derive(Clone)]
pub struct SqlxProvider {
    pool: MySqlPool,
}

impl SqlxProvider {
    /// Wraps an existing pool.
    pub fn new(pool: MySqlPool) -> Self {
        SqlxProvider { pool }
    }

    /// Builds a lazily connecting pool for `dsn`.
    ///
    /// No connection is opened here; the first flush does that, so an
    /// unreachable store only shows up as a flush failure.
    pub fn connect_lazy(dsn: &str, max_connections: u32) -> Result<Self, InitializationError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(DB_ACQUIRE_TIMEOUT)
            .idle_timeout(Some(Duration::from_secs(600)))
            .connect_lazy_with(connect_options(dsn)?);
        info!("ClickHouse pool configured (max connections: {max_connections})");
        Ok(SqlxProvider { pool })
    }
}

impl StoreProvider for SqlxProvider {
    type Handle = MySqlPool;

    async fn get(&self) -> Result<MySqlPool, StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Unavailable("pool is closed".to_string()));
        }
        Ok(self.pool.clone())
    }
}

impl StoreHandle for MySqlPool {
    type Transaction = SqlxTransaction;

    async fn exec(&self, sql: &str) -> Result<(), StoreError> {
        sqlx::query(sql).execute(self).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    async fn begin(&self) -> Result<SqlxTransaction, StoreError> {
        let conn = self.acquire().await?;
        Ok(SqlxTransaction {
            conn,
            statement: None,
            rows: Vec::new(),
        })
    }
}

/// Rows buffered on a pooled connection until commit.
pub struct SqlxTransaction {
    conn: PoolConnection<MySql>,
    statement: Option<String>,
    rows: Vec<Vec<Value>>,
}

impl StoreTransaction for SqlxTransaction {
    type Statement = String;

    async fn prepare(&mut self, sql: &str) -> Result<String, StoreError> {
        if values_group(sql).is_none() {
            return Err(StoreError::Driver(format!(
                "insert statement has no VALUES clause: {sql}"
            )));
        }
        self.statement = Some(sql.to_string());
        Ok(sql.to_string())
    }

    async fn execute(&mut self, _statement: &String, params: &[Value]) -> Result<(), StoreError> {
        self.rows.push(params.to_vec());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if self.rows.is_empty() {
            return Ok(());
        }
        let Some(statement) = self.statement.as_deref() else {
            return Err(StoreError::Driver("commit without a prepared insert".into()));
        };
        let width = self.rows[0].len().max(1);
        for chunk in self.rows.chunks((MAX_PLACEHOLDERS / width).max(1)) {
            let sql = multi_row_insert(statement, chunk.len());
            let arguments = bind_rows(chunk)?;
            sqlx::query_with(&sql, arguments)
                .execute(&mut *self.conn)
                .await?;
        }
        Ok(())
    }
}

/// The `(?, ...)` placeholder group at the end of a single-row insert.
fn values_group(sql: &str) -> Option<&str> {
    let (_, group) = sql.rsplit_once("VALUES")?;
    let group = group.trim();
    (group.starts_with('(') && group.ends_with(')')).then_some(group)
}

/// Repeats the placeholder group of a single-row insert `rows` times.
fn multi_row_insert(sql: &str, rows: usize) -> String {
    let Some(group) = values_group(sql) else {
        return sql.to_string();
    };
    let mut statement = String::with_capacity(sql.len() + (group.len() + 2) * rows);
    statement.push_str(sql);
    for _ in 1..rows {
        statement.push_str(", ");
        statement.push_str(group);
    }
    statement
}

/// Binds every value of every row, in order.
fn bind_rows(rows: &[Vec<Value>]) -> Result<MySqlArguments, StoreError> {
    let mut arguments = MySqlArguments::default();
    for value in rows.iter().flatten() {
        let bound = match value {
            // ClickHouse `DateTime` has no zone; rows are stored in UTC.
            Value::DateTime(v) => arguments.add(v.naive_utc()),
            Value::String(v) => arguments.add(v.clone()),
            Value::UInt64(v) => arguments.add(*v),
            Value::UInt32(v) => arguments.add(*v),
            Value::UInt16(v) => arguments.add(*v),
            Value::UInt8(v) => arguments.add(*v),
        };
        bound.map_err(|e| StoreError::Driver(format!("failed to bind {value:?}: {e}")))?;
    }
    Ok(arguments)
}
