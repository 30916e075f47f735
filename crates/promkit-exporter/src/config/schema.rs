use std::net::SocketAddr;

use serde::Deserialize;

use promkit_core::desc::validate_name;
use promkit_core::error::{MetricsError, Result};
use promkit_core::metric::{HistogramOpts, Objective, SummaryOpts};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub exporter: ExporterSection,

    #[serde(default)]
    pub workload: WorkloadSection,

    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricConfig>,
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if self.metrics.is_empty() {
            return Err(MetricsError::Config("metrics must not be empty".into()));
        }

        self.exporter.validate()?;
        self.workload.validate()?;
        for m in &self.metrics {
            m.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            MetricsError::Config(format!("exporter.listen {:?} is not a socket address: {e}", self.listen))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

/// Synthetic traffic applied to every configured metric on each tick.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadSection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_gauge_min")]
    pub gauge_min: f64,

    #[serde(default = "default_gauge_max")]
    pub gauge_max: f64,

    #[serde(default = "default_observe_max")]
    pub observe_max: f64,
}

impl Default for WorkloadSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            gauge_min: default_gauge_min(),
            gauge_max: default_gauge_max(),
            observe_max: default_observe_max(),
        }
    }
}

impl WorkloadSection {
    pub fn validate(&self) -> Result<()> {
        if !(10..=600_000).contains(&self.interval_ms) {
            return Err(MetricsError::Config(
                "workload.interval_ms must be between 10 and 600000".into(),
            ));
        }
        if !(self.gauge_min.is_finite() && self.gauge_max.is_finite() && self.gauge_min < self.gauge_max) {
            return Err(MetricsError::Config(
                "workload.gauge_min must be finite and less than gauge_max".into(),
            ));
        }
        if !(self.observe_max.is_finite() && self.observe_max > 0.0) {
            return Err(MetricsError::Config(
                "workload.observe_max must be finite and positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_interval_ms() -> u64 {
    2000
}
fn default_gauge_min() -> f64 {
    20.0
}
fn default_gauge_max() -> f64 {
    35.0
}
fn default_observe_max() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum MetricConfig {
    Counter {
        name: String,
        help: String,
    },
    Gauge {
        name: String,
        help: String,
    },
    Histogram {
        name: String,
        help: String,
        /// Empty means the default buckets.
        #[serde(default)]
        buckets: Vec<f64>,
    },
    Summary {
        name: String,
        help: String,
        #[serde(default)]
        objectives: Vec<Objective>,
        #[serde(default)]
        max_age_ms: Option<u64>,
        #[serde(default)]
        age_buckets: Option<u32>,
        #[serde(default)]
        buf_cap: Option<usize>,
    },
}

impl MetricConfig {
    pub fn name(&self) -> &str {
        match self {
            MetricConfig::Counter { name, .. }
            | MetricConfig::Gauge { name, .. }
            | MetricConfig::Histogram { name, .. }
            | MetricConfig::Summary { name, .. } => name,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(self.name())?;
        match self {
            MetricConfig::Histogram { .. } => self.histogram_opts().validate(),
            MetricConfig::Summary { .. } => self.summary_opts().validate(),
            _ => Ok(()),
        }
    }

    /// Histogram options; defaults for any other kind.
    pub fn histogram_opts(&self) -> HistogramOpts {
        match self {
            MetricConfig::Histogram { buckets, .. } => HistogramOpts::new(buckets.clone()),
            _ => HistogramOpts::default(),
        }
    }

    /// Summary options; defaults for any other kind.
    pub fn summary_opts(&self) -> SummaryOpts {
        let mut opts = SummaryOpts::default();
        if let MetricConfig::Summary {
            objectives,
            max_age_ms,
            age_buckets,
            buf_cap,
            ..
        } = self
        {
            opts.objectives = objectives.clone();
            if let Some(v) = max_age_ms {
                opts.max_age_ms = *v;
            }
            if let Some(v) = age_buckets {
                opts.age_buckets = *v;
            }
            if let Some(v) = buf_cap {
                opts.buf_cap = *v;
            }
        }
        opts
    }
}

/// The four demo metrics used when `metrics` is omitted.
pub fn default_metrics() -> Vec<MetricConfig> {
    vec![
        MetricConfig::Counter {
            name: "demo_request_total".into(),
            help: "Total number of demo requests".into(),
        },
        MetricConfig::Gauge {
            name: "demo_temperature_celsius".into(),
            help: "Current temperature in Celsius".into(),
        },
        MetricConfig::Histogram {
            name: "demo_request_duration_seconds".into(),
            help: "Histogram of response time for demo requests".into(),
            buckets: Vec::new(),
        },
        MetricConfig::Summary {
            name: "demo_request_duration_summary_seconds".into(),
            help: "Summary of response time for demo requests".into(),
            objectives: vec![
                Objective::new(0.5, 0.05),
                Objective::new(0.9, 0.01),
                Objective::new(0.99, 0.001),
            ],
            max_age_ms: None,
            age_buckets: None,
            buf_cap: None,
        },
    ]
}
