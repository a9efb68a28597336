// Shared test helpers: an in-memory store that records every call.
//
// The writer under test talks to it through the public provider traits, and
// tests inspect what reached the "store" afterwards. Failures and latency can
// be injected per step.

#![allow(dead_code)] // Not every test file uses every helper

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proxy_stat::{
    FlushStep, StoreError, StoreHandle, StoreProvider, StoreTransaction, TelemetryRecord, Value,
};

/// One call observed by the mock store.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Get,
    Exec(String),
    Ping,
    Begin,
    Prepare(String),
    Execute(usize),
    Commit(usize),
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    committed: Vec<Vec<Vec<Value>>>,
    failures: HashMap<FlushStep, usize>,
    commit_delay: Duration,
}

/// Recording store provider. Clones share state.
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<State>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `times` calls at `step` fail.
    pub fn fail(&self, step: FlushStep, times: usize) {
        self.state.lock().unwrap().failures.insert(step, times);
    }

    /// Delays every commit, simulating a slow store.
    pub fn set_commit_delay(&self, delay: Duration) {
        self.state.lock().unwrap().commit_delay = delay;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    /// DDL statements executed, in order.
    pub fn ddl(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Exec(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }

    /// Insert statements prepared, in order.
    pub fn prepared(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Prepare(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }

    /// Rows of every committed batch, in commit order.
    pub fn committed(&self) -> Vec<Vec<Vec<Value>>> {
        self.state.lock().unwrap().committed.clone()
    }

    pub fn committed_batch_sizes(&self) -> Vec<usize> {
        self.committed().iter().map(Vec::len).collect()
    }

    fn record(&self, event: Event, step: FlushStep) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.events.push(event);
        match state.failures.get_mut(&step) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(StoreError::Driver(format!("injected {step} failure")))
            }
            _ => Ok(()),
        }
    }
}

impl StoreProvider for MockStore {
    type Handle = MockStore;

    async fn get(&self) -> Result<MockStore, StoreError> {
        self.record(Event::Get, FlushStep::Connect)?;
        Ok(self.clone())
    }
}

impl StoreHandle for MockStore {
    type Transaction = MockTransaction;

    async fn exec(&self, sql: &str) -> Result<(), StoreError> {
        self.record(Event::Exec(sql.to_string()), FlushStep::CreateTable)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.record(Event::Ping, FlushStep::Ping)
    }

    async fn begin(&self) -> Result<MockTransaction, StoreError> {
        self.record(Event::Begin, FlushStep::Begin)?;
        Ok(MockTransaction {
            store: self.clone(),
            rows: Vec::new(),
        })
    }
}

/// Buffers rows until commit.
pub struct MockTransaction {
    store: MockStore,
    rows: Vec<Vec<Value>>,
}

impl StoreTransaction for MockTransaction {
    type Statement = String;

    async fn prepare(&mut self, sql: &str) -> Result<String, StoreError> {
        self.store
            .record(Event::Prepare(sql.to_string()), FlushStep::Prepare)?;
        Ok(sql.to_string())
    }

    async fn execute(&mut self, _statement: &String, params: &[Value]) -> Result<(), StoreError> {
        self.store
            .record(Event::Execute(self.rows.len()), FlushStep::Exec)?;
        self.rows.push(params.to_vec());
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let delay = self.store.state.lock().unwrap().commit_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.store
            .record(Event::Commit(self.rows.len()), FlushStep::Commit)?;
        self.store.state.lock().unwrap().committed.push(self.rows);
        Ok(())
    }
}

/// A record whose path carries `seq`, for order checks.
pub fn numbered_record(seq: usize) -> TelemetryRecord {
    TelemetryRecord {
        path: format!("/seq/{seq}"),
        status: 200,
        grouped_status: 200,
        ..Default::default()
    }
}

/// Extracts the `path` column of a stored row.
pub fn row_path(row: &[Value]) -> &str {
    match &row[6] {
        Value::String(path) => path,
        other => panic!("path column holds {other:?}"),
    }
}
