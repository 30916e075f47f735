//! Process-wide default registry.
//!
//! Initialised on first use and never torn down. Tests should build their
//! own `Registry` instead so they can run in parallel.

use std::sync::{Arc, OnceLock};

use crate::error::Result;
use crate::metric::Collector;
use crate::registry::Registry;
use crate::snapshot::MetricSnapshot;

static DEFAULT_REGISTRY: OnceLock<Arc<Registry>> = OnceLock::new();

pub fn default_registry() -> &'static Registry {
    shared()
}

/// Owned handle to the default registry, for holders that also accept a
/// private `Arc<Registry>`.
pub fn default_registry_arc() -> Arc<Registry> {
    Arc::clone(shared())
}

fn shared() -> &'static Arc<Registry> {
    DEFAULT_REGISTRY.get_or_init(|| Arc::new(Registry::new()))
}

/// Register with the default registry.
pub fn register<C>(metric: C) -> Result<()>
where
    C: Collector + 'static,
{
    default_registry().register(metric)
}

/// Remove from the default registry.
pub fn unregister(name: &str) -> bool {
    default_registry().unregister(name)
}

/// Snapshot the default registry.
pub fn collect() -> Vec<MetricSnapshot> {
    default_registry().collect()
}
