pub mod grouping;

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;

use batchwise_core::{BatchResult, Query, QueryError, RefId};
use futures::FutureExt;
use tracing::instrument;

use crate::context::QueryContext;
use crate::error::DispatchError;
use crate::executor::ExecutorLookup;

/// Lifecycle of a batch within one request.
///
/// `Pending -> Waiting -> Running -> Done`, where `Waiting` is skipped when
/// the batch has nothing to wait for. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
pub enum BatchState {
    Pending,
    Waiting,
    Running,
    Done,
}

impl BatchState {
    pub fn can_transition_to(self, next: BatchState) -> bool {
        use BatchState::*;
        matches!(
            (self, next),
            (Pending, Waiting) | (Pending, Running) | (Waiting, Running) | (Running, Done)
        )
    }

    /// Handed to `process` at some point
    pub fn is_started(self) -> bool {
        matches!(self, BatchState::Running | BatchState::Done)
    }

    pub fn is_done(self) -> bool {
        self == BatchState::Done
    }
}

/// Queries sharing one data source, dispatched as a single unit.
///
/// A batch always holds at least one query, and all of its queries have the
/// same data-source id.
#[derive(Debug, Clone)]
pub struct Batch {
    data_source_id: i64,
    queries: Vec<Query>,
    depends: BTreeSet<RefId>,
    state: BatchState,
}

impl Batch {
    /// Start a batch for the data source of `query`
    pub fn new(query: Query) -> Self {
        Self {
            data_source_id: query.data_source.id,
            queries: vec![query],
            depends: BTreeSet::new(),
            state: BatchState::Pending,
        }
    }

    pub fn data_source_id(&self) -> i64 {
        self.data_source_id
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// RefIds owned by other batches that must complete first
    pub fn depends(&self) -> &BTreeSet<RefId> {
        &self.depends
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn ref_ids(&self) -> Vec<RefId> {
        self.queries.iter().map(|q| q.ref_id.clone()).collect()
    }

    pub fn contains(&self, ref_id: &str) -> bool {
        self.queries.iter().any(|q| q.ref_id == ref_id)
    }

    pub(crate) fn add_query(&mut self, query: Query) {
        debug_assert_eq!(query.data_source.id, self.data_source_id);
        self.queries.push(query);
    }

    pub(crate) fn add_dependency(&mut self, ref_id: RefId) {
        self.depends.insert(ref_id);
    }

    fn advance(&mut self, next: BatchState) -> Result<(), DispatchError> {
        if !self.state.can_transition_to(next) {
            return Err(DispatchError::InvalidTransition {
                data_source_id: self.data_source_id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// True iff every dependency already has a result in `context`
    pub fn all_dependencies_are_in(&self, context: &QueryContext) -> bool {
        context.has_all(&self.depends)
    }

    /// Suspend until every dependency has a result, moving to `Waiting`
    /// if any is still missing.
    pub async fn wait_for_dependencies(&mut self, context: &QueryContext) -> Result<(), DispatchError> {
        if self.all_dependencies_are_in(context) {
            return Ok(());
        }
        self.advance(BatchState::Waiting)?;
        tracing::debug!(
            data_source_id = self.data_source_id,
            depends = ?self.depends,
            "Batch waiting for dependencies"
        );
        context.wait_for(&self.depends).await;
        Ok(())
    }

    /// Run the batch through the executor registered for its data-source
    /// type and publish exactly one result on the context's channel.
    ///
    /// Dependencies are not checked here. A batch that was already handed to
    /// `process` is rejected without publishing anything.
    #[instrument(skip_all, fields(data_source_id = self.data_source_id, queries = self.queries.len()))]
    pub async fn process(
        &mut self,
        executors: &dyn ExecutorLookup,
        context: &QueryContext,
    ) -> Result<(), DispatchError> {
        self.advance(BatchState::Running)?;

        // never empty, see Batch::new
        let plugin_id = self.queries[0].data_source.plugin_id.clone();

        let result = match executors.find_executor(&plugin_id) {
            Some(executor) => {
                let outcome = AssertUnwindSafe(executor.execute(&self.queries, context))
                    .catch_unwind()
                    .await;
                self.advance(BatchState::Done)?;
                match outcome {
                    Ok(result) => result,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        tracing::error!(plugin_id = %plugin_id, panic = %message, "Executor panicked");
                        BatchResult::failed(
                            QueryError::execution(format!("executor panicked: {message}")),
                            &self.queries,
                        )
                    }
                }
            }
            None => {
                tracing::warn!(plugin_id = %plugin_id, "No executor registered for data source type");
                self.advance(BatchState::Done)?;
                BatchResult::failed(QueryError::ExecutorNotFound { plugin_id }, &self.queries)
            }
        };

        context.publish(result).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
