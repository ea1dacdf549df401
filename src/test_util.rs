//! Executors and helpers for exercising the dispatcher without a backend.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::{BatchResult, DataSource, Query, QueryContext, QueryError, QueryExecutor, QueryResult, RefId};

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn data_source(id: i64, plugin_id: &str) -> DataSource {
    DataSource::new(id, format!("{plugin_id}-{id}"), plugin_id)
}

pub fn query(ref_id: &str, data_source: &DataSource, depends: &[&str]) -> Query {
    Query::new(ref_id, data_source.clone()).with_depends(depends.iter().copied())
}

/// Answers every query with `{"refId": .., "model": ..}` after an optional delay
#[derive(Debug, Default)]
pub struct StaticExecutor {
    delay: Option<Duration>,
}

impl StaticExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay) }
    }
}

#[async_trait]
impl QueryExecutor for StaticExecutor {
    async fn execute(&self, queries: &[Query], _context: &QueryContext) -> BatchResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        queries.iter().fold(BatchResult::new(), |result, q| {
            result.with_result(QueryResult::ok(
                q.ref_id.clone(),
                json!({ "refId": q.ref_id, "model": q.model }),
            ))
        })
    }
}

/// Fails the whole batch with the same execution error
#[derive(Debug)]
pub struct FailingExecutor {
    message: String,
}

impl FailingExecutor {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl QueryExecutor for FailingExecutor {
    async fn execute(&self, queries: &[Query], _context: &QueryContext) -> BatchResult {
        BatchResult::failed(QueryError::execution(self.message.clone()), queries)
    }
}

/// Never returns; for timeout and cancellation tests
#[derive(Debug, Default)]
pub struct PendingExecutor;

#[async_trait]
impl QueryExecutor for PendingExecutor {
    async fn execute(&self, _queries: &[Query], _context: &QueryContext) -> BatchResult {
        std::future::pending().await
    }
}

/// One call observed by a [`RecordingExecutor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub ref_ids: Vec<RefId>,
    /// RefIds that had a result in the context when the call started
    pub visible: BTreeSet<RefId>,
}

/// Answers like [`StaticExecutor`] while recording what each call saw and
/// how many calls overlapped.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    delay: Option<Duration>,
    records: Mutex<Vec<ExecutionRecord>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub async fn records(&self) -> Vec<ExecutionRecord> {
        self.records.lock().await.clone()
    }

    pub async fn record_for(&self, ref_id: &str) -> Option<ExecutionRecord> {
        self.records()
            .await
            .into_iter()
            .find(|r| r.ref_ids.iter().any(|id| id == ref_id))
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn execute(&self, queries: &[Query], context: &QueryContext) -> BatchResult {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let record = ExecutionRecord {
            ref_ids: queries.iter().map(|q| q.ref_id.clone()).collect(),
            visible: context.results().into_keys().collect(),
        };
        self.records.lock().await.push(record);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = StaticExecutor::new().execute(queries, context).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
