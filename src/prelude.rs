pub use batchwise_core::{
    BatchResult, DataSource, Query, QueryError, QueryResult, RefId, Request, TimeRange,
};
pub use batchwise_query::{
    get_batches, Batch, BatchState, DispatchConfig, DispatchError, Dispatcher, ExecutorLookup,
    ExecutorRegistry, QueryContext, QueryExecutor, Response,
};
pub use async_trait::async_trait;
