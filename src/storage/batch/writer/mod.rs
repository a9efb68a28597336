//! Batch writer implementation.
//!
//! Producers append records under a short std mutex. When the live batch
//! reaches `batch_size` it is swapped for an empty one and sent to a single
//! flush worker task over an unbounded channel, so `add` never waits on the
//! store. The send happens while the batch lock is held, which makes the
//! channel order the detachment order.
//!
//! Flushes themselves are serialized by a Tokio mutex that also guards the
//! one-time table provisioning flag (see `flush.rs`). The two locks are
//! never held together on the producer path.
//!
//! Closing sends the remainder down the same channel as the final batch and
//! drops the sender. The worker returns that batch's outcome when it exits,
//! so `close` only ever waits on the worker's join handle.

mod flush;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error_handling::{FlushError, FlushStats, FlushStatsSnapshot, WriterError};
use crate::storage::provider::StoreProvider;

use super::types::{TelemetryRecord, WriterConfig};

type BatchSender = mpsc::UnboundedSender<Vec<TelemetryRecord>>;
type BatchReceiver = mpsc::UnboundedReceiver<Vec<TelemetryRecord>>;

/// The live batch and the hand-off to the flush worker.
///
/// `sender` is `None` once the writer is closed.
struct Pending {
    records: Vec<TelemetryRecord>,
    sender: Option<BatchSender>,
}

impl Pending {
    /// Swaps out the live batch and queues it for the flush worker.
    fn detach(&mut self, capacity: usize) -> Result<(), WriterError> {
        let Some(sender) = self.sender.as_ref() else {
            return Err(WriterError::Closed);
        };
        let batch = std::mem::replace(&mut self.records, Vec::with_capacity(capacity));
        sender.send(batch).map_err(|err| {
            log::error!(
                "Flush worker is gone, dropping batch of {} records",
                err.0.len()
            );
            WriterError::WorkerGone
        })
    }
}

/// Provisioning guard, only touched while the flush lock is held.
struct FlushState {
    provisioned: bool,
}

/// Close bookkeeping, guarded by an async mutex held for the whole close.
struct Shutdown {
    /// Taken once the worker has been joined.
    worker: Option<JoinHandle<Result<(), FlushError>>>,
    /// Whether the completed close flushed everything; `None` until then.
    outcome: Option<bool>,
}

struct Inner<P: StoreProvider> {
    provider: P,
    config: WriterConfig,
    pending: Mutex<Pending>,
    flush_state: tokio::sync::Mutex<FlushState>,
    stats: FlushStats,
}

impl<P: StoreProvider> Inner<P> {
    fn lock_pending(&self) -> MutexGuard<'_, Pending> {
        // Nothing in the critical section can leave `Pending` half-updated.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a non-empty live batch ahead of its size threshold.
    fn detach_partial(&self) {
        let mut pending = self.lock_pending();
        if pending.records.is_empty() || pending.sender.is_none() {
            return;
        }
        log::debug!(
            "Flush interval elapsed, detaching {} pending records",
            pending.records.len()
        );
        let _ = pending.detach(self.config.batch_size);
    }

    /// Stops intake and queues the remainder, possibly empty, as the
    /// worker's final batch. No-op if intake already stopped.
    fn finish_intake(&self) {
        let mut pending = self.lock_pending();
        let Some(sender) = pending.sender.take() else {
            return;
        };
        let remainder = std::mem::take(&mut pending.records);
        if let Err(err) = sender.send(remainder) {
            let rows = err.0.len();
            if rows > 0 {
                log::error!("Flush worker is gone, {rows} buffered records lost");
                self.stats.record_lost(rows);
            }
        }
    }
}

/// Accumulates telemetry records and persists them in batches.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct BatchWriter<P: StoreProvider> {
    inner: Arc<Inner<P>>,
    shutdown: tokio::sync::Mutex<Shutdown>,
}

impl<P: StoreProvider> BatchWriter<P> {
    /// Creates a writer and spawns its flush worker on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBatchSize` or `InvalidFlushInterval` for unusable
    /// configuration, and `NoRuntime` when called outside Tokio.
    pub fn new(provider: P, config: WriterConfig) -> Result<Self, WriterError> {
        if config.batch_size == 0 {
            return Err(WriterError::InvalidBatchSize);
        }
        if config.flush_interval.is_some_and(|d| d.is_zero()) {
            return Err(WriterError::InvalidFlushInterval);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| WriterError::NoRuntime)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            provider,
            pending: Mutex::new(Pending {
                records: Vec::with_capacity(config.batch_size),
                sender: Some(sender),
            }),
            config,
            flush_state: tokio::sync::Mutex::new(FlushState { provisioned: false }),
            stats: FlushStats::new(),
        });
        let worker = runtime.spawn(run_worker(Arc::clone(&inner), receiver));

        Ok(BatchWriter {
            inner,
            shutdown: tokio::sync::Mutex::new(Shutdown {
                worker: Some(worker),
                outcome: None,
            }),
        })
    }

    /// Appends a record to the live batch.
    ///
    /// Never waits on the store. Crossing the batch size hands the full batch
    /// to the flush worker; store failures from that flush are only logged.
    ///
    /// # Errors
    ///
    /// `Closed` after `close`, `WorkerGone` if the flush worker has died.
    pub fn add(&self, record: TelemetryRecord) -> Result<(), WriterError> {
        let batch_size = self.inner.config.batch_size;
        let mut pending = self.inner.lock_pending();
        if pending.sender.is_none() {
            return Err(WriterError::Closed);
        }
        pending.records.push(record);
        self.inner.stats.record_added();
        if pending.records.len() >= batch_size {
            pending.detach(batch_size)?;
        }
        Ok(())
    }

    /// Number of records in the live batch.
    pub fn pending_len(&self) -> usize {
        self.inner.lock_pending().records.len()
    }

    /// Current flush counters.
    pub fn stats(&self) -> FlushStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Stops accepting records and flushes everything still buffered.
    ///
    /// Batches detached before the call are flushed first, in order; the
    /// remainder of the live batch is flushed last and its outcome returned.
    /// Failures of earlier batches are only logged and counted.
    ///
    /// Concurrent and repeated calls wait for the first close to finish and
    /// then return `Ok(())`, or `CloseFailed` if it failed. Cancelling the
    /// future does not lose records: once intake has stopped, the remainder
    /// belongs to the flush worker, and a later `close` waits for it.
    ///
    /// # Errors
    ///
    /// `Store` when the final flush fails, `WorkerGone` if the flush worker
    /// panicked.
    pub async fn close(&self) -> Result<(), WriterError> {
        let mut shutdown = self.shutdown.lock().await;
        if let Some(flushed) = shutdown.outcome {
            return if flushed {
                Ok(())
            } else {
                Err(WriterError::CloseFailed)
            };
        }

        self.inner.finish_intake();

        let result = match shutdown.worker.as_mut() {
            Some(worker) => match worker.await {
                Ok(last) => last.map_err(WriterError::from),
                Err(e) => {
                    log::error!("Flush worker terminated abnormally: {e}");
                    Err(WriterError::WorkerGone)
                }
            },
            None => Ok(()),
        };
        shutdown.worker = None;
        shutdown.outcome = Some(result.is_ok());
        result
    }
}

impl<P: StoreProvider> Drop for BatchWriter<P> {
    /// Hands any remainder to the flush worker without waiting for it.
    ///
    /// Best effort: if the runtime running the worker has shut down, the
    /// remainder is counted as dropped instead.
    fn drop(&mut self) {
        let mut pending = self.inner.lock_pending();
        let Some(sender) = pending.sender.take() else {
            return;
        };
        let remainder = std::mem::take(&mut pending.records);
        if remainder.is_empty() {
            return;
        }
        let rows = remainder.len();
        match sender.send(remainder) {
            Ok(()) => log::warn!(
                "BatchWriter dropped without close, flushing {rows} records in the background"
            ),
            Err(_) => {
                log::error!(
                    "BatchWriter dropped without close after its flush worker stopped, {rows} records lost"
                );
                self.inner.stats.record_lost(rows);
            }
        }
    }
}

/// Flushes detached batches one at a time until every sender is gone.
///
/// Returns the outcome of the last batch received, which is the close
/// remainder when the writer was closed.
async fn run_worker<P: StoreProvider>(
    inner: Arc<Inner<P>>,
    mut receiver: BatchReceiver,
) -> Result<(), FlushError> {
    let mut ticker = inner.config.flush_interval.map(|period| {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    let mut last = Ok(());
    loop {
        let batch = match ticker.as_mut() {
            Some(ticker) => tokio::select! {
                batch = receiver.recv() => batch,
                _ = ticker.tick() => {
                    inner.detach_partial();
                    continue;
                }
            },
            None => receiver.recv().await,
        };
        let Some(batch) = batch else {
            break;
        };
        last = inner.store(batch).await;
        if let Err(e) = &last {
            log::warn!("Failed to store to ClickHouse: {e}");
        }
    }

    log::debug!("Flush worker stopped");
    last
}
