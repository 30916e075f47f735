//! promkit exporter library entry.
//!
//! Wires the metrics core to an HTTP pull endpoint and a demo workload. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod ops;
pub mod router;
pub mod workload;
