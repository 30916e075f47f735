use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::desc::{Desc, MetricKind};
use crate::error::{MetricsError, Result};
use crate::snapshot::{MetricSnapshot, SnapshotValue};

use super::atomic::AtomicF64;
use super::Collector;

/// Arbitrary finite value, last write wins.
#[derive(Clone)]
pub struct Gauge {
    inner: Arc<GaugeInner>,
}

struct GaugeInner {
    desc: Desc,
    value: AtomicF64,
}

impl Gauge {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(GaugeInner {
                desc: Desc::new(name, help, MetricKind::Gauge),
                value: AtomicF64::new(0.0),
            }),
        }
    }

    pub fn set(&self, v: f64) -> Result<()> {
        self.check_finite(v)?;
        self.inner.value.store(v);
        Ok(())
    }

    pub fn add(&self, delta: f64) -> Result<()> {
        self.check_finite(delta)?;
        self.inner.value.add(delta);
        Ok(())
    }

    pub fn sub(&self, delta: f64) -> Result<()> {
        self.add(-delta)
    }

    pub fn inc(&self) {
        self.inner.value.add(1.0);
    }

    pub fn dec(&self) {
        self.inner.value.add(-1.0);
    }

    /// Set to the current Unix time in seconds.
    pub fn set_to_current_time(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.inner.value.store(now);
    }

    pub fn value(&self) -> f64 {
        self.inner.value.load()
    }

    fn check_finite(&self, v: f64) -> Result<()> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(MetricsError::InvalidArgument(format!(
                "gauge {} requires a finite value, got {v}",
                self.inner.desc.name()
            )))
        }
    }
}

impl Collector for Gauge {
    fn desc(&self) -> &Desc {
        &self.inner.desc
    }

    fn collect(&self) -> MetricSnapshot {
        MetricSnapshot::new(&self.inner.desc, SnapshotValue::Gauge(self.value()))
    }
}
