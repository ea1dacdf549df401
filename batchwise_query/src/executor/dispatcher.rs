use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use batchwise_core::{BatchResult, QueryError, QueryResult, RefId, Request};
use tokio::select;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::batch::grouping::get_batches;
use crate::batch::Batch;
use crate::context::QueryContext;
use crate::error::DispatchError;
use crate::executor::core::config::DispatchConfig;
use crate::executor::utils::metrics::DispatchMetrics;
use crate::executor::ExecutorLookup;

/// How long one batch spent executing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTiming {
    pub data_source_id: i64,
    pub ref_ids: Vec<RefId>,
    pub elapsed: Duration,
}

/// Outcome of a whole request
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub results: HashMap<RefId, QueryResult>,
    pub batch_timings: Vec<BatchTiming>,
}

impl Response {
    pub fn result(&self, ref_id: &str) -> Option<&QueryResult> {
        self.results.get(ref_id)
    }
}

/// Drives a request from grouping to the last published result.
///
/// Every batch gets its own task. A task sleeps until the results of its
/// dependencies are in the context, takes a concurrency permit and runs the
/// batch. A single collector drains the results channel and is the only
/// writer of the context's result map.
pub struct Dispatcher {
    executors: Arc<dyn ExecutorLookup>,
    config: DispatchConfig,
    metrics: Arc<DispatchMetrics>,
}

struct BatchWorker {
    batch: Batch,
    context: Arc<QueryContext>,
    executors: Arc<dyn ExecutorLookup>,
    permits: Arc<Semaphore>,
    metrics: Arc<DispatchMetrics>,
}

impl BatchWorker {
    async fn run(mut self) -> Result<BatchTiming, DispatchError> {
        self.batch.wait_for_dependencies(&self.context).await?;

        let _permit = self
            .permits
            .acquire_owned()
            .await
            .map_err(|e| DispatchError::Worker(e.to_string()))?;

        let start = Instant::now();
        self.batch
            .process(self.executors.as_ref(), &self.context)
            .await?;
        let elapsed = start.elapsed();
        self.metrics
            .update_dispatched(usize::try_from(elapsed.as_micros()).unwrap_or(usize::MAX));

        Ok(BatchTiming {
            data_source_id: self.batch.data_source_id(),
            ref_ids: self.batch.ref_ids(),
            elapsed,
        })
    }
}

impl Dispatcher {
    pub fn new(executors: Arc<dyn ExecutorLookup>, config: DispatchConfig) -> Result<Self, DispatchError> {
        config.validate().map_err(DispatchError::InvalidConfig)?;
        Ok(Self {
            executors,
            config,
            metrics: Arc::new(DispatchMetrics::new()),
        })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        self.metrics.clone()
    }

    pub async fn handle_request(&self, request: Request) -> Result<Response, DispatchError> {
        self.handle_request_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Like [`Dispatcher::handle_request`], aborting outstanding batches once
    /// `cancel` fires. Results already written stay as they are and nothing
    /// more is published.
    #[instrument(skip_all, fields(queries = request.len()))]
    pub async fn handle_request_with_cancel(
        &self,
        request: Request,
        cancel: CancellationToken,
    ) -> Result<Response, DispatchError> {
        let batches = get_batches(&request);
        let expected = batches.len();
        let (context, mut results_rx) = QueryContext::new(request.time_range.clone(), expected);
        let context = Arc::new(context);
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_batches));
        let deadline = self.config.request_timeout.map(|timeout| Instant::now() + timeout);

        tracing::debug!(batches = expected, "Dispatching request");

        let mut workers = JoinSet::new();
        for batch in batches {
            let worker = BatchWorker {
                batch,
                context: context.clone(),
                executors: self.executors.clone(),
                permits: permits.clone(),
                metrics: self.metrics.clone(),
            };
            workers.spawn(worker.run());
        }

        let mut batch_timings = Vec::with_capacity(expected);
        let mut received = 0;
        while received < expected {
            let outcome = select! {
                _ = cancel.cancelled() => Err(DispatchError::Cancelled),
                _ = deadline_elapsed(deadline) => Err(DispatchError::Timeout(
                    self.config.request_timeout.unwrap_or_default(),
                )),
                Some(result) = results_rx.recv() => {
                    received += 1;
                    self.collect(&context, result);
                    Ok(())
                }
                Some(joined) = workers.join_next() => match joined {
                    Ok(Ok(timing)) => {
                        batch_timings.push(timing);
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(DispatchError::Worker(e.to_string())),
                },
            };

            if let Err(e) = outcome {
                tracing::warn!(
                    error = %e,
                    received,
                    expected,
                    "Aborting outstanding batches"
                );
                workers.abort_all();
                return Err(e);
            }
        }

        // every batch has published; the remaining workers only return timings
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(timing)) => batch_timings.push(timing),
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(DispatchError::Worker(e.to_string())),
            }
        }

        Ok(Response {
            results: context.results(),
            batch_timings,
        })
    }

    fn collect(&self, context: &QueryContext, result: BatchResult) {
        if let Some(error) = &result.error {
            self.metrics.update_failure();
            if matches!(error, QueryError::ExecutorNotFound { .. }) {
                self.metrics.update_missing_executor();
            }
            tracing::warn!(error = %error, "Batch finished with an error");
        }
        context.merge(&result);
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
