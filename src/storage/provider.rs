//! Store provider interface.
//!
//! The writer never manages connections itself. It asks a `StoreProvider`
//! for a live handle at the start of every flush and drives DDL, ping and a
//! single insert transaction through the traits below. Pooling, reconnects
//! and I/O timeouts are the provider's business.
//!
//! All returned futures are `Send` so flushes can run on spawned Tokio tasks.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error_handling::StoreError;

/// A typed column value bound to a prepared insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `DateTime` column, second precision in the store
    DateTime(DateTime<Utc>),
    /// `String` column
    String(String),
    /// `UInt64` column
    UInt64(u64),
    /// `UInt32` column
    UInt32(u32),
    /// `UInt16` column
    UInt16(u16),
    /// `UInt8` column, also used for booleans
    UInt8(u8),
}

/// Supplies live store handles on demand.
pub trait StoreProvider: Send + Sync + 'static {
    /// Handle type handed to each flush.
    type Handle: StoreHandle;

    /// Returns a live handle, or an error if the store is unavailable.
    fn get(&self) -> impl Future<Output = Result<Self::Handle, StoreError>> + Send;
}

/// A handle able to run statements and open transactions.
pub trait StoreHandle: Send + Sync {
    /// Transaction type opened by `begin`.
    type Transaction: StoreTransaction;

    /// Executes a statement that returns no rows (DDL).
    fn exec(&self, sql: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Lightweight liveness check.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Opens a transaction for one batch.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, StoreError>> + Send;
}

/// An open transaction. Dropping it without `commit` discards its writes.
pub trait StoreTransaction: Send {
    /// Prepared statement type.
    type Statement: Send + Sync;

    /// Prepares `sql` once for repeated execution.
    fn prepare(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<Self::Statement, StoreError>> + Send;

    /// Executes `statement` once with `params` bound in column order.
    fn execute(
        &mut self,
        statement: &Self::Statement,
        params: &[Value],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Commits every execution since `begin`.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
