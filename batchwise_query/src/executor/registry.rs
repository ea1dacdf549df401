use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use super::{ExecutorLookup, QueryExecutor};

/// Static registration of an executor, collected with `inventory`.
///
/// ```ignore
/// inventory::submit! {
///     ExecutorRegistration::new("prometheus", make_prometheus_executor)
/// }
/// ```
#[derive(Clone)]
pub struct ExecutorRegistration {
    pub plugin_id: &'static str,
    pub factory: fn() -> Arc<dyn QueryExecutor>,
}

impl ExecutorRegistration {
    pub const fn new(plugin_id: &'static str, factory: fn() -> Arc<dyn QueryExecutor>) -> Self {
        Self { plugin_id, factory }
    }
}

inventory::collect!(ExecutorRegistration);

/// Data-source type -> executor table
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: DashMap<String, Arc<dyn QueryExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every executor submitted through [`ExecutorRegistration`]
    pub fn from_inventory() -> Self {
        let registry = Self::new();
        for registration in inventory::iter::<ExecutorRegistration> {
            tracing::debug!(plugin_id = registration.plugin_id, "Registering executor");
            registry.register(registration.plugin_id, (registration.factory)());
        }
        registry
    }

    /// Register an executor, returning the one it replaced
    pub fn register(
        &self,
        plugin_id: impl Into<String>,
        executor: Arc<dyn QueryExecutor>,
    ) -> Option<Arc<dyn QueryExecutor>> {
        self.executors.insert(plugin_id.into(), executor)
    }

    pub fn unregister(&self, plugin_id: &str) -> Option<Arc<dyn QueryExecutor>> {
        self.executors.remove(plugin_id).map(|(_, executor)| executor)
    }

    pub fn contains(&self, plugin_id: &str) -> bool {
        self.executors.contains_key(plugin_id)
    }

    pub fn plugin_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.executors.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl ExecutorLookup for ExecutorRegistry {
    fn find_executor(&self, plugin_id: &str) -> Option<Arc<dyn QueryExecutor>> {
        self.executors.get(plugin_id).map(|entry| entry.value().clone())
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("plugin_ids", &self.plugin_ids())
            .finish()
    }
}
