//! promkit: process-local metrics with a Prometheus-style pull endpoint.
//!
//! Facade crate. The metric primitives, registry and text encoder are
//! re-exported at the root; `promkit::exporter` holds the HTTP server and its
//! config loader.

pub use promkit_core::*;

pub mod exporter {
    pub use promkit_exporter::*;
}
