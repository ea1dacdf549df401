use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct DispatchMetrics {
    pub batches_dispatched: AtomicUsize,
    pub batches_failed: AtomicUsize,
    pub executors_missing: AtomicUsize,
    pub total_batch_time: AtomicUsize,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed batch and how long it took in microseconds
    pub fn update_dispatched(&self, duration: usize) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.total_batch_time.fetch_add(duration, Ordering::Relaxed);
    }

    pub fn update_failure(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_missing_executor(&self) {
        self.executors_missing.fetch_add(1, Ordering::Relaxed);
    }

    /// Get average batch duration in microseconds
    pub fn average_batch_duration(&self) -> Option<usize> {
        let total = self.batches_dispatched.load(Ordering::Relaxed);
        if total == 0 {
            None
        } else {
            Some(self.total_batch_time.load(Ordering::Relaxed) / total)
        }
    }

    /// Share of dispatched batches without a batch-level error, as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.batches_dispatched.load(Ordering::Relaxed);
        if total == 0 {
            100.0
        } else {
            let failed = self.batches_failed.load(Ordering::Relaxed).min(total);
            ((total - failed) as f64 / total as f64) * 100.0
        }
    }
}
