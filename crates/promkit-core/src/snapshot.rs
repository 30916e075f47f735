//! Point-in-time views of metrics, produced by `Collector::collect` and
//! consumed by the exposition encoder.

use serde::Serialize;

use crate::desc::{Desc, MetricKind};

/// One metric's sampled state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub name: String,
    pub help: String,
    pub value: SnapshotValue,
}

impl MetricSnapshot {
    pub fn new(desc: &Desc, value: SnapshotValue) -> Self {
        Self {
            name: desc.name().to_string(),
            help: desc.help().to_string(),
            value,
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self.value {
            SnapshotValue::Counter(_) => MetricKind::Counter,
            SnapshotValue::Gauge(_) => MetricKind::Gauge,
            SnapshotValue::Histogram(_) => MetricKind::Histogram,
            SnapshotValue::Summary(_) => MetricKind::Summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SnapshotValue {
    Counter(f64),
    Gauge(f64),
    Histogram(HistogramSnapshot),
    Summary(SummarySnapshot),
}

/// Cumulative bucket counts; `+Inf` is implied by `count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    pub buckets: Vec<Bucket>,
    pub sum: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    pub upper_bound: f64,
    pub cumulative_count: u64,
}

/// `sum`/`count` are all-time; `quantiles` cover only the retained window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummarySnapshot {
    pub quantiles: Vec<QuantileValue>,
    pub sum: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantileValue {
    pub quantile: f64,
    pub value: f64,
}
