//! Name-keyed metric registry.
//!
//! The map is only locked (per shard) to check/insert/remove names and to
//! clone out the collector handles at the start of `collect`. Each metric is
//! then snapshotted outside any registry lock, under its own bounded
//! critical section.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::desc::validate_name;
use crate::error::{MetricsError, Result};
use crate::metric::Collector;
use crate::snapshot::MetricSnapshot;

#[derive(Default)]
pub struct Registry {
    metrics: DashMap<String, Arc<dyn Collector>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            metrics: DashMap::new(),
        }
    }

    /// Register a metric under its descriptor name.
    ///
    /// Fails with `InvalidName` if the name is not a valid identifier and with
    /// `DuplicateName` if the name is taken.
    pub fn register<C>(&self, metric: C) -> Result<()>
    where
        C: Collector + 'static,
    {
        self.register_arc(Arc::new(metric))
    }

    pub fn register_arc(&self, metric: Arc<dyn Collector>) -> Result<()> {
        let desc = metric.desc();
        let name = desc.name().to_string();
        let kind = desc.kind();

        if let Err(e) = validate_name(&name) {
            tracing::warn!(name = %name, "metric registration rejected: invalid name");
            return Err(e);
        }

        match self.metrics.entry(name) {
            Entry::Occupied(o) => {
                tracing::warn!(name = %o.key(), "metric registration rejected: duplicate name");
                Err(MetricsError::DuplicateName(o.key().clone()))
            }
            Entry::Vacant(v) => {
                tracing::debug!(name = %v.key(), %kind, "metric registered");
                v.insert(metric);
                Ok(())
            }
        }
    }

    /// Remove a metric. Absent names are not an error; returns whether
    /// something was removed.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.metrics.remove(name).is_some();
        if removed {
            tracing::debug!(name = %name, "metric unregistered");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Registered names in ascending order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metrics.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshot every registered metric, sorted by name.
    pub fn collect(&self) -> Vec<MetricSnapshot> {
        let handles: Vec<Arc<dyn Collector>> =
            self.metrics.iter().map(|e| Arc::clone(e.value())).collect();

        let mut out: Vec<MetricSnapshot> = handles.iter().map(|m| m.collect()).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}
