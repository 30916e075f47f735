//! promkit core: process-local metric primitives, registry, and text
//! exposition.
//!
//! Counters, gauges and histograms are updated lock-free from any number of
//! threads. Summaries estimate windowed quantiles in bounded memory behind a
//! per-instance mutex. A `Registry` snapshots everything for a pull-based
//! collector and `exposition::encode` renders the snapshot as text.
//!
//! Nothing here does I/O or needs an async runtime; serving the text is up to
//! the caller (see `promkit-exporter`).
//!
//! # Defensive guarantees
//! `unwrap`, `expect` and `panic!` are denied in non-test code. Every
//! programmer error surfaces as a `MetricsError`; poisoned locks are
//! recovered rather than propagated.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod clock;
pub mod desc;
pub mod error;
pub mod exposition;
pub mod global;
pub mod metric;
pub mod quantile;
pub mod registry;
pub mod snapshot;

pub use desc::{Desc, MetricKind};
pub use error::{ErrorKind, MetricsError, Result};
pub use global::{default_registry, default_registry_arc};
pub use metric::{
    Collector, Counter, Gauge, Histogram, HistogramOpts, Objective, Observer, Summary, SummaryOpts,
    Timer,
};
pub use registry::Registry;
pub use snapshot::MetricSnapshot;
