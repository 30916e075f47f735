//! Shared application state for the exporter.
//!
//! Builds every configured metric once at startup, registers it, and keeps a
//! reporting handle for the workload task. Startup errors are returned, not
//! panicked on.

use std::sync::Arc;

use promkit_core::error::Result;
use promkit_core::exposition;
use promkit_core::{default_registry_arc, Counter, Gauge, Histogram, MetricSnapshot, Registry, Summary};

use crate::config::{ExporterConfig, MetricConfig};

/// Reporting handle for one configured metric.
#[derive(Clone)]
pub enum Instrument {
    Counter(Counter),
    Gauge(Gauge),
    Histogram(Histogram),
    Summary(Summary),
}

impl Instrument {
    fn build(m: &MetricConfig) -> Result<Self> {
        Ok(match m {
            MetricConfig::Counter { name, help } => Instrument::Counter(Counter::new(name, help)),
            MetricConfig::Gauge { name, help } => Instrument::Gauge(Gauge::new(name, help)),
            MetricConfig::Histogram { name, help, .. } => {
                Instrument::Histogram(Histogram::new(name, help, m.histogram_opts())?)
            }
            MetricConfig::Summary { name, help, .. } => {
                Instrument::Summary(Summary::new(name, help, m.summary_opts())?)
            }
        })
    }

    fn register(&self, registry: &Registry) -> Result<()> {
        match self {
            Instrument::Counter(c) => registry.register(c.clone()),
            Instrument::Gauge(g) => registry.register(g.clone()),
            Instrument::Histogram(h) => registry.register(h.clone()),
            Instrument::Summary(s) => registry.register(s.clone()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    registry: Arc<Registry>,
    instruments: Vec<Instrument>,
}

impl AppState {
    /// Build state on top of the process-wide default registry.
    pub fn new(cfg: ExporterConfig) -> Result<Self> {
        Self::with_registry(cfg, default_registry_arc())
    }

    /// Build state on a caller-supplied registry (isolated tests).
    pub fn with_registry(cfg: ExporterConfig, registry: Arc<Registry>) -> Result<Self> {
        let mut instruments = Vec::with_capacity(cfg.metrics.len());
        for m in &cfg.metrics {
            let instrument = Instrument::build(m)?;
            instrument.register(&registry)?;
            instruments.push(instrument);
        }
        tracing::info!(metrics = ?registry.names(), "metrics registered");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                instruments,
            }),
        })
    }

    pub fn cfg(&self) -> &ExporterConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.inner.instruments
    }

    pub fn snapshot(&self) -> Vec<MetricSnapshot> {
        self.inner.registry.collect()
    }

    /// Text exposition of the registry.
    pub fn render(&self) -> String {
        exposition::encode(&self.snapshot())
    }
}
