use std::collections::HashMap;

use serde_json::Value;

use super::query::{Query, RefId};
use crate::error::QueryError;

/// Outcome of one query: a value or an error.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub ref_id: RefId,
    pub outcome: Result<Value, QueryError>,
}

impl QueryResult {
    pub fn ok(ref_id: impl Into<RefId>, value: Value) -> Self {
        Self {
            ref_id: ref_id.into(),
            outcome: Ok(value),
        }
    }

    pub fn err(ref_id: impl Into<RefId>, error: QueryError) -> Self {
        Self {
            ref_id: ref_id.into(),
            outcome: Err(error),
        }
    }

    pub fn value(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&QueryError> {
        self.outcome.as_ref().err()
    }

    pub fn is_err(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Everything one batch produced.
///
/// Executors are expected to return an entry for every query they were
/// handed. When `error` is set, the same error should be present on each
/// entry; [`BatchResult::failed`] builds such a result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub error: Option<QueryError>,
    pub query_results: HashMap<RefId, QueryResult>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch-level failure applied to every member query
    pub fn failed(error: QueryError, queries: &[Query]) -> Self {
        let query_results = queries
            .iter()
            .map(|q| (q.ref_id.clone(), QueryResult::err(q.ref_id.clone(), error.clone())))
            .collect();
        Self {
            error: Some(error),
            query_results,
        }
    }

    pub fn with_result(mut self, result: QueryResult) -> Self {
        self.insert(result);
        self
    }

    pub fn insert(&mut self, result: QueryResult) {
        self.query_results.insert(result.ref_id.clone(), result);
    }

    pub fn get(&self, ref_id: &str) -> Option<&QueryResult> {
        self.query_results.get(ref_id)
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    pub fn len(&self) -> usize {
        self.query_results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query_results.is_empty()
    }
}
