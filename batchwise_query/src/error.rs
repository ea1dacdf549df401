use std::time::Duration;

use thiserror::Error;

use crate::batch::BatchState;

/// Failures of the dispatch machinery itself.
///
/// Query and executor failures never show up here; they travel inside
/// [`batchwise_core::BatchResult`] like any other result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Request was cancelled")]
    Cancelled,
    #[error("Result channel closed")]
    ChannelClosed,
    #[error("Batch for data source {data_source_id} cannot move from {from} to {to}")]
    InvalidTransition {
        data_source_id: i64,
        from: BatchState,
        to: BatchState,
    },
    #[error("Invalid dispatch configuration: {0}")]
    InvalidConfig(String),
    #[error("Batch worker failed: {0}")]
    Worker(String),
}
