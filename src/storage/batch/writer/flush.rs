//! Batch flushing logic.

use crate::error_handling::{FlushError, FlushStep, StoreError};
use crate::storage::batch::types::TelemetryRecord;
use crate::storage::provider::{StoreHandle, StoreProvider, StoreTransaction};
use crate::storage::schema::{create_table_statements, insert_statement};

use super::{FlushState, Inner};

impl<P: StoreProvider> Inner<P> {
    /// Writes one detached batch to the store in a single transaction.
    ///
    /// Holds the flush lock for the whole call, so at most one flush talks to
    /// the store at a time and batches commit in the order they reach this
    /// lock. Any failure aborts the whole batch: nothing is committed and
    /// nothing is retried.
    pub(super) async fn store(&self, batch: Vec<TelemetryRecord>) -> Result<(), FlushError> {
        let mut state = self.flush_state.lock().await;
        if batch.is_empty() {
            return Ok(());
        }

        let rows = batch.len();
        log::info!("Storing {} rows to ClickHouse", rows);
        match self.store_locked(&mut state, &batch).await {
            Ok(()) => {
                self.stats.record_flushed(rows);
                log::info!("Finish storing {} rows to ClickHouse", rows);
                Ok(())
            }
            Err(e) => {
                self.stats.record_failed(e.step, rows);
                Err(e)
            }
        }
    }

    async fn store_locked(
        &self,
        state: &mut FlushState,
        batch: &[TelemetryRecord],
    ) -> Result<(), FlushError> {
        let handle = self
            .provider
            .get()
            .await
            .map_err(FlushError::at(FlushStep::Connect))?;

        // Attempted once per writer, even if it fails.
        if !state.provisioned {
            state.provisioned = true;
            self.stats.record_provisioning();
            provision(&handle, self.config.replicated)
                .await
                .map_err(FlushError::at(FlushStep::CreateTable))?;
        }

        handle
            .ping()
            .await
            .map_err(FlushError::at(FlushStep::Ping))?;

        let mut tx = handle
            .begin()
            .await
            .map_err(FlushError::at(FlushStep::Begin))?;
        let statement = tx
            .prepare(&insert_statement(self.config.replicated))
            .await
            .map_err(FlushError::at(FlushStep::Prepare))?;
        for record in batch {
            let row = record.to_row(&self.config.node_name);
            tx.execute(&statement, &row)
                .await
                .map_err(FlushError::at(FlushStep::Exec))?;
        }
        tx.commit()
            .await
            .map_err(FlushError::at(FlushStep::Commit))
    }
}

/// Runs the schema DDL in order, stopping at the first failure.
async fn provision<H: StoreHandle>(handle: &H, replicated: bool) -> Result<(), StoreError> {
    for ddl in create_table_statements(replicated) {
        handle.exec(&ddl).await?;
    }
    log::info!(
        "Provisioned ClickHouse schema ({})",
        if replicated { "replicated" } else { "local" }
    );
    Ok(())
}
