//! Metric primitives.
//!
//! Every primitive is a cheap `Clone` handle around shared state: keep one
//! handle for reporting and hand another to a `Registry`.

mod atomic;
pub mod counter;
pub mod gauge;
pub mod histogram;
pub mod summary;

use std::time::Instant;

use crate::desc::Desc;
use crate::snapshot::MetricSnapshot;

pub use counter::Counter;
pub use gauge::Gauge;
pub use histogram::{exponential_buckets, linear_buckets, Histogram, HistogramOpts, DEFAULT_BUCKETS};
pub use summary::{Objective, Summary, SummaryOpts};

/// Anything the registry can snapshot.
pub trait Collector: Send + Sync {
    fn desc(&self) -> &Desc;

    /// Take a consistent point-in-time snapshot. Must only hold per-metric
    /// critical sections.
    fn collect(&self) -> MetricSnapshot;
}

/// Metrics that take a stream of observed values (histograms, summaries).
pub trait Observer: Send + Sync {
    fn observe(&self, v: f64);
}

/// Observes elapsed wall time in seconds when stopped or dropped.
pub struct Timer<'a, O: Observer + ?Sized> {
    observer: &'a O,
    start: Instant,
    done: bool,
}

impl<'a, O: Observer + ?Sized> Timer<'a, O> {
    pub fn new(observer: &'a O) -> Self {
        Self {
            observer,
            start: Instant::now(),
            done: false,
        }
    }

    /// Record now and return the observed seconds.
    pub fn observe_duration(mut self) -> f64 {
        self.record()
    }

    fn record(&mut self) -> f64 {
        let secs = self.start.elapsed().as_secs_f64();
        self.observer.observe(secs);
        self.done = true;
        secs
    }
}

impl<O: Observer + ?Sized> Drop for Timer<'_, O> {
    fn drop(&mut self) {
        if !self.done {
            self.record();
        }
    }
}
