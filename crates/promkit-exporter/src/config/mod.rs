//! Exporter config loader (strict parsing).

pub mod schema;

use std::fs;

use promkit_core::error::{MetricsError, Result};

pub use schema::{ExporterConfig, ExporterSection, MetricConfig, WorkloadSection};

/// Used when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "promkit.yaml";

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MetricsError::Config(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| MetricsError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
