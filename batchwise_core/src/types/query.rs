use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::data_source::DataSource;

/// Caller-assigned label of a query, unique within a request.
pub type RefId = String;

/// A single logical query. Immutable once the request is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub ref_id: RefId,
    pub data_source: DataSource,
    /// RefIds whose results this query is computed from
    #[serde(default)]
    pub depends: Vec<RefId>,
    /// Backend specific query body, opaque to the batching engine
    #[serde(default)]
    pub model: Value,
    #[serde(default)]
    pub max_data_points: i64,
    #[serde(default)]
    pub interval_ms: i64,
}

impl Query {
    pub fn new(ref_id: impl Into<RefId>, data_source: DataSource) -> Self {
        Self {
            ref_id: ref_id.into(),
            data_source,
            depends: Vec::new(),
            model: Value::Null,
            max_data_points: 0,
            interval_ms: 0,
        }
    }

    pub fn with_depends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RefId>,
    {
        self.depends = depends.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_model(mut self, model: Value) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_data_points(mut self, max_data_points: i64) -> Self {
        self.max_data_points = max_data_points;
        self
    }

    pub fn with_interval_ms(mut self, interval_ms: i64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn data_source_id(&self) -> i64 {
        self.data_source.id
    }
}

/// Unparsed time range of a request, e.g. `now-6h` to `now`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

impl TimeRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::new("now-6h", "now")
    }
}

/// Ordered queries plus the time range shared by all of them.
///
/// Order matters: a query's dependencies must appear before it, otherwise
/// the dependency edge is not recorded when the request is grouped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub time_range: TimeRange,
    pub queries: Vec<Query>,
}

impl Request {
    pub fn new(queries: Vec<Query>) -> Self {
        Self {
            time_range: TimeRange::default(),
            queries,
        }
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    pub fn query(&self, ref_id: &str) -> Option<&Query> {
        self.queries.iter().find(|q| q.ref_id == ref_id)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
