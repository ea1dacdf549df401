pub mod core;
pub mod dispatcher;
pub mod registry;
pub mod utils;

use std::sync::Arc;

use async_trait::async_trait;
use batchwise_core::{BatchResult, Query};

use crate::context::QueryContext;

pub use self::core::config::DispatchConfig;
pub use dispatcher::{BatchTiming, Dispatcher, Response};
pub use registry::{ExecutorRegistration, ExecutorRegistry};
pub use utils::metrics::DispatchMetrics;

/// Backend capability for one data-source type
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute every query of a batch.
    ///
    /// Results of the batch's dependencies are readable through `context`.
    /// The returned value is published as is, so it should contain an entry
    /// for each query in `queries`.
    async fn execute(&self, queries: &[Query], context: &QueryContext) -> BatchResult;
}

/// Resolves the executor for a data-source type
pub trait ExecutorLookup: Send + Sync {
    fn find_executor(&self, plugin_id: &str) -> Option<Arc<dyn QueryExecutor>>;
}
