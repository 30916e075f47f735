use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::desc::{Desc, MetricKind};
use crate::error::{MetricsError, Result};
use crate::snapshot::{MetricSnapshot, SnapshotValue};

use super::atomic::AtomicF64;
use super::Collector;

// 2^53: above this not every whole f64 is exact as an integer delta.
const MAX_EXACT_WHOLE: f64 = 9_007_199_254_740_992.0;

/// Monotonically non-decreasing value.
///
/// Whole-number deltas below 2^53 go through a checked integer add;
/// fractional deltas, larger deltas and anything that would overflow the
/// integer part use a CAS loop on the float part. `value()` is their sum.
#[derive(Clone)]
pub struct Counter {
    inner: Arc<CounterInner>,
}

struct CounterInner {
    desc: Desc,
    int_val: AtomicU64,
    float_val: AtomicF64,
}

impl Counter {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(CounterInner {
                desc: Desc::new(name, help, MetricKind::Counter),
                int_val: AtomicU64::new(0),
                float_val: AtomicF64::new(0.0),
            }),
        }
    }

    /// Increment by 1.
    pub fn inc(&self) {
        if !self.add_whole(1) {
            self.inner.float_val.add(1.0);
        }
    }

    /// Increment by `delta`; negative or NaN deltas are rejected.
    pub fn add(&self, delta: f64) -> Result<()> {
        if delta.is_nan() || delta < 0.0 {
            return Err(MetricsError::InvalidArgument(format!(
                "counter {} cannot be incremented by {delta}",
                self.inner.desc.name()
            )));
        }

        if delta < MAX_EXACT_WHOLE && delta.fract() == 0.0 && self.add_whole(delta as u64) {
            return Ok(());
        }
        self.inner.float_val.add(delta);
        Ok(())
    }

    /// Integer fast path. Returns false, leaving the counter untouched, when
    /// the integer part would overflow.
    fn add_whole(&self, whole: u64) -> bool {
        self.inner
            .int_val
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| cur.checked_add(whole))
            .is_ok()
    }

    pub fn value(&self) -> f64 {
        let ival = self.inner.int_val.load(Ordering::Relaxed);
        self.inner.float_val.load() + ival as f64
    }
}

impl Collector for Counter {
    fn desc(&self) -> &Desc {
        &self.inner.desc
    }

    fn collect(&self) -> MetricSnapshot {
        MetricSnapshot::new(&self.inner.desc, SnapshotValue::Counter(self.value()))
    }
}
