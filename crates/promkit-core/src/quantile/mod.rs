//! Streaming quantile estimation.
//!
//! `Stream` is a targeted-quantile sketch after Cormode, Korn, Muthukrishnan
//! and Srivastava ("Effective Computation of Biased Quantiles over Data
//! Streams"). Answers are approximate: for every target `(φ, ε)` the value
//! returned for `φ` has a true rank within `φ·n ± ε·n` of the observations
//! merged so far. Exact quantiles would need the whole sample set in memory.

mod ckms;

pub use ckms::{Stream, Target};
