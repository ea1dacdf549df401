use batchwise_core::{BatchResult, QueryResult, RefId, TimeRange};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use tokio::sync::{mpsc, Notify};

use crate::error::DispatchError;

/// Request-scoped state shared by every batch worker.
///
/// Holds the RefId -> result map and the sending half of the results
/// channel. The map is append-only and every RefId is written at most once,
/// so a dependency that has been seen present stays present.
#[derive(Debug)]
pub struct QueryContext {
    time_range: TimeRange,
    results: DashMap<RefId, QueryResult>,
    result_added: Notify,
    results_tx: mpsc::Sender<BatchResult>,
}

impl QueryContext {
    /// Create a context together with the receiving end of its results
    /// channel. `capacity` should be at least the number of batches, so a
    /// worker never blocks on publishing.
    pub fn new(time_range: TimeRange, capacity: usize) -> (Self, mpsc::Receiver<BatchResult>) {
        let (results_tx, results_rx) = mpsc::channel(capacity.max(1));
        let context = Self {
            time_range,
            results: DashMap::new(),
            result_added: Notify::new(),
            results_tx,
        };
        (context, results_rx)
    }

    pub fn time_range(&self) -> &TimeRange {
        &self.time_range
    }

    /// Publish a batch's result on the shared channel
    pub async fn publish(&self, result: BatchResult) -> Result<(), DispatchError> {
        self.results_tx
            .send(result)
            .await
            .map_err(|_| DispatchError::ChannelClosed)
    }

    /// Record a completed query and wake everyone waiting on results.
    ///
    /// Returns false, leaving the stored result untouched, if the RefId was
    /// already written.
    pub fn insert_result(&self, result: QueryResult) -> bool {
        let inserted = match self.results.entry(result.ref_id.clone()) {
            Entry::Occupied(entry) => {
                tracing::warn!(ref_id = %entry.key(), "Ignoring duplicate result for an already completed query");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(result);
                true
            }
        };
        if inserted {
            self.result_added.notify_waiters();
        }
        inserted
    }

    /// Record every query result of a batch, returning how many were new
    pub fn merge(&self, batch: &BatchResult) -> usize {
        let mut added = 0;
        for result in batch.query_results.values() {
            if self.insert_result(result.clone()) {
                added += 1;
            }
        }
        added
    }

    pub fn contains_result(&self, ref_id: &str) -> bool {
        self.results.contains_key(ref_id)
    }

    pub fn result(&self, ref_id: &str) -> Option<QueryResult> {
        self.results.get(ref_id).map(|entry| entry.value().clone())
    }

    /// True iff every key already has a result
    pub fn has_all<'a, I>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'a RefId>,
    {
        keys.into_iter().all(|key| self.results.contains_key(key))
    }

    /// Suspend until every key has a result.
    ///
    /// Interest in the notification is registered before the map is checked,
    /// so an insert landing between the check and the await still wakes us.
    pub async fn wait_for<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a RefId> + Clone,
    {
        loop {
            let notified = self.result_added.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.has_all(keys.clone()) {
                return;
            }
            notified.await;
        }
    }

    /// Snapshot of all results written so far
    pub fn results(&self) -> HashMap<RefId, QueryResult> {
        self.results
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
