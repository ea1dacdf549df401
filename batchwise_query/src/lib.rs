//! batchwise_query - groups a request's queries into per-data-source batches
//! and dispatches them once the results they depend on are available.
//!
//! The flow is `Request -> get_batches -> Dispatcher -> QueryExecutor`, with
//! every batch publishing exactly one [`BatchResult`] on the request's
//! [`QueryContext`].
//!
//! [`BatchResult`]: batchwise_core::BatchResult

pub mod batch;
pub mod context;
pub mod error;
pub mod executor;

pub use batch::grouping::get_batches;
pub use batch::{Batch, BatchState};
pub use context::QueryContext;
pub use error::DispatchError;
pub use executor::{
    BatchTiming, DispatchConfig, DispatchMetrics, Dispatcher, ExecutorLookup, ExecutorRegistration,
    ExecutorRegistry, QueryExecutor, Response,
};
