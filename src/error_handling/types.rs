//! Error type definitions.
//!
//! This module defines the error types used by the writer, the store adapter
//! and the broadcast gate, plus the `FlushStep` enum that tags which part of
//! a flush failed.

use log::SetLoggerError;
use strum_macros::{Display, EnumIter as EnumIterMacro};
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error connecting the store pool (bad DSN, unsupported options).
    #[error("Store pool initialization error: {0}")]
    StorePoolError(#[from] sqlx::Error),
}

/// Errors reported by a store provider, handle or transaction.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The provider could not hand out a live handle.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// SQL execution error from the sqlx-backed adapter.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// Any other driver-level failure.
    #[error("{0}")]
    Driver(String),
}

/// The individual steps of a flush, in execution order.
///
/// The `Display` form reads as a verb phrase so that a `FlushError` renders
/// as e.g. "Failed to ping: ...".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro, Display)]
pub enum FlushStep {
    /// Acquiring a handle from the provider
    #[strum(to_string = "get ClickHouse DB")]
    Connect,
    /// One-time schema provisioning
    #[strum(to_string = "create table")]
    CreateTable,
    /// Liveness check before the transaction
    #[strum(to_string = "ping")]
    Ping,
    /// Opening the batch transaction
    #[strum(to_string = "begin")]
    Begin,
    /// Preparing the insert statement
    #[strum(to_string = "prepare")]
    Prepare,
    /// Executing one row
    #[strum(to_string = "exec")]
    Exec,
    /// Committing the batch
    #[strum(to_string = "commit")]
    Commit,
}

/// A store failure wrapped with the flush step that produced it.
#[derive(Error, Debug)]
#[error("Failed to {step}: {source}")]
pub struct FlushError {
    /// Step that failed.
    pub step: FlushStep,
    /// Underlying store error.
    pub source: StoreError,
}

impl FlushError {
    pub(crate) fn at(step: FlushStep) -> impl FnOnce(StoreError) -> FlushError {
        move |source| FlushError { step, source }
    }
}

/// Errors returned by `BatchWriter`.
///
/// Producers only ever see the configuration/programming variants from
/// `add`. Store failures surface from `close` as `Store`.
#[derive(Error, Debug)]
pub enum WriterError {
    /// A batch size of zero would never trigger a flush.
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,

    /// A zero flush interval would spin the flush worker.
    #[error("flush interval must be greater than zero")]
    InvalidFlushInterval,

    /// The writer was constructed outside a Tokio runtime.
    #[error("BatchWriter must be created inside a Tokio runtime")]
    NoRuntime,

    /// The writer has been closed and no longer accepts records.
    #[error("BatchWriter is closed")]
    Closed,

    /// The background flush task is no longer running.
    #[error("flush worker is no longer running")]
    WorkerGone,

    /// An earlier `close` already failed to flush the remainder.
    #[error("an earlier close failed to flush remaining records")]
    CloseFailed,

    /// The final flush performed by `close` failed.
    #[error(transparent)]
    Store(#[from] FlushError),
}

/// Errors observed by a `WaitHandle`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    /// The gate was dropped without ever being released.
    #[error("gate dropped before release")]
    Abandoned,
}
