use thiserror::Error;

/// Error attached to a single query result or to a whole batch.
///
/// Batch-level errors are copied onto every member query, so the type is
/// cheap to clone and comparable in tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Could not find executor for data source type: {plugin_id}")]
    ExecutorNotFound { plugin_id: String },
    #[error("Query execution failed: {0}")]
    Execution(String),
}

impl QueryError {
    pub fn execution(message: impl Into<String>) -> Self {
        QueryError::Execution(message.into())
    }
}
