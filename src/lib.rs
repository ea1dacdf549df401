//! batchwise - dependency-ordered query batching
//!
//! Queries of a request are grouped into one batch per data source, batches
//! wait for the results they depend on, and each batch is handed to the
//! executor registered for its data-source type. Every batch reports exactly
//! one result, failures included.
//!
//! ```ignore
//! let registry = ExecutorRegistry::from_inventory();
//! let dispatcher = Dispatcher::new(Arc::new(registry), DispatchConfig::default())?;
//! let response = dispatcher.handle_request(request).await?;
//! ```

pub mod prelude;
pub mod test_util;

pub use batchwise_core::{
    BatchResult, DataSource, Query, QueryError, QueryResult, RefId, Request, TimeRange,
};
pub use batchwise_query::{
    get_batches, Batch, BatchState, BatchTiming, DispatchConfig, DispatchError, DispatchMetrics,
    Dispatcher, ExecutorLookup, ExecutorRegistration, ExecutorRegistry, QueryContext,
    QueryExecutor, Response,
};
pub use async_trait::async_trait;
pub use inventory;

/// Register an executor factory for a data-source type, picked up by
/// [`ExecutorRegistry::from_inventory`].
#[macro_export]
macro_rules! register_executor {
    ($plugin_id:expr, $factory:path) => {
        $crate::inventory::submit! {
            $crate::ExecutorRegistration::new($plugin_id, $factory)
        }
    };
}
