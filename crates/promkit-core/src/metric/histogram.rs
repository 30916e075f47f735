//! Fixed-bucket histogram.
//!
//! Observers never take a lock. Each observation bumps one combined
//! `count_and_hot` word, then one bucket counter, the sum and the completion
//! count of the "hot" shard. `collect` flips the hot bit under a small mutex,
//! waits until every writer that started on the now-cold shard has finished,
//! reads it, and folds it back into the new hot shard. Readers therefore see
//! bucket counts, `sum` and `count` from the same set of observations.
//!
//! Bucket lookup only reads the immutable `upper_bounds`, so it needs no
//! synchronisation against concurrent increments.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;

use crate::desc::{Desc, MetricKind};
use crate::error::{MetricsError, Result};
use crate::snapshot::{Bucket, HistogramSnapshot, MetricSnapshot, SnapshotValue};

use super::atomic::AtomicF64;
use super::{Collector, Observer, Timer};

/// Default boundaries, tuned for request latencies in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

// Above this many boundaries bucket lookup switches to binary search.
const LINEAR_SEARCH_MAX: usize = 16;

const HOT_BIT: u64 = 1 << 63;
const COUNT_MASK: u64 = HOT_BIT - 1;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistogramOpts {
    /// Strictly increasing upper bounds. Empty means `DEFAULT_BUCKETS`.
    #[serde(default)]
    pub buckets: Vec<f64>,
}

impl Default for HistogramOpts {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS.to_vec(),
        }
    }
}

impl HistogramOpts {
    pub fn new(buckets: Vec<f64>) -> Self {
        Self { buckets }
    }

    pub fn validate(&self) -> Result<()> {
        self.upper_bounds().map(|_| ())
    }

    /// Effective finite boundaries. A trailing `+Inf` is implicit and dropped.
    fn upper_bounds(&self) -> Result<Vec<f64>> {
        let mut bounds = if self.buckets.is_empty() {
            DEFAULT_BUCKETS.to_vec()
        } else {
            self.buckets.clone()
        };
        if bounds.last() == Some(&f64::INFINITY) {
            bounds.pop();
        }

        if bounds.iter().any(|b| b.is_nan()) {
            return Err(MetricsError::InvalidArgument(
                "histogram buckets must not contain NaN".into(),
            ));
        }
        if let Some(w) = bounds.windows(2).find(|w| w[0] >= w[1]) {
            return Err(MetricsError::InvalidArgument(format!(
                "histogram buckets must be strictly increasing ({} >= {})",
                w[0], w[1]
            )));
        }
        Ok(bounds)
    }
}

/// `count` buckets of equal `width`, the first with upper bound `start`.
pub fn linear_buckets(start: f64, width: f64, count: usize) -> Result<Vec<f64>> {
    if count < 1 {
        return Err(MetricsError::InvalidArgument(
            "linear_buckets needs a positive count".into(),
        ));
    }
    if !(width > 0.0) {
        return Err(MetricsError::InvalidArgument(
            "linear_buckets needs a positive width".into(),
        ));
    }
    Ok((0..count).map(|i| start + width * i as f64).collect())
}

/// `count` buckets where each upper bound is `factor` times the previous one.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Result<Vec<f64>> {
    if count < 1 {
        return Err(MetricsError::InvalidArgument(
            "exponential_buckets needs a positive count".into(),
        ));
    }
    if !(start > 0.0) {
        return Err(MetricsError::InvalidArgument(
            "exponential_buckets needs a positive start".into(),
        ));
    }
    if !(factor > 1.0) {
        return Err(MetricsError::InvalidArgument(
            "exponential_buckets needs a factor greater than 1".into(),
        ));
    }

    let mut out = Vec::with_capacity(count);
    let mut b = start;
    for _ in 0..count {
        out.push(b);
        b *= factor;
    }
    Ok(out)
}

/// One half of the double buffer. `buckets` has one extra slot for `+Inf`.
struct Shard {
    count: AtomicU64,
    sum: AtomicF64,
    buckets: Box<[AtomicU64]>,
}

impl Shard {
    fn new(slots: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicF64::new(0.0),
            buckets: (0..slots).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn observe(&self, v: f64, bucket: usize) {
        self.buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.sum.add(v);
        // completion marker, must come last
        self.count.fetch_add(1, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct Histogram {
    inner: Arc<HistogramInner>,
}

struct HistogramInner {
    desc: Desc,
    upper_bounds: Vec<f64>,
    // top bit: index of the hot shard; remaining bits: observations started
    count_and_hot: AtomicU64,
    shards: [Shard; 2],
    collect_lock: Mutex<()>,
}

impl Histogram {
    pub fn new(name: impl Into<String>, help: impl Into<String>, opts: HistogramOpts) -> Result<Self> {
        let upper_bounds = opts.upper_bounds()?;
        let slots = upper_bounds.len() + 1;
        Ok(Self {
            inner: Arc::new(HistogramInner {
                desc: Desc::new(name, help, MetricKind::Histogram),
                upper_bounds,
                count_and_hot: AtomicU64::new(0),
                shards: [Shard::new(slots), Shard::new(slots)],
                collect_lock: Mutex::new(()),
            }),
        })
    }

    /// Finite boundaries in ascending order (`+Inf` excluded).
    pub fn upper_bounds(&self) -> &[f64] {
        &self.inner.upper_bounds
    }

    pub fn observe(&self, v: f64) {
        let bucket = self.find_bucket(v);
        let n = self.inner.count_and_hot.fetch_add(1, Ordering::AcqRel);
        self.inner.shards[(n >> 63) as usize].observe(v, bucket);
    }

    /// Time a section of code; seconds are observed when the timer drops.
    pub fn start_timer(&self) -> Timer<'_, Self> {
        Timer::new(self)
    }

    /// Take a consistent snapshot (cumulative bucket counts).
    pub fn snapshot(&self) -> HistogramSnapshot {
        let inner = &*self.inner;
        let _guard = inner
            .collect_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let n = inner.count_and_hot.fetch_add(HOT_BIT, Ordering::AcqRel);
        let count = n & COUNT_MASK;
        let cold_idx = (n >> 63) as usize;
        let cold = &inner.shards[cold_idx];
        let hot = &inner.shards[cold_idx ^ 1];

        // Writers that picked the cold shard before the flip finish in
        // bounded time; wait for their completion markers.
        while cold.count.load(Ordering::Acquire) != count {
            std::thread::yield_now();
        }

        let mut cumulative = 0u64;
        let mut buckets = Vec::with_capacity(inner.upper_bounds.len());
        for (i, &upper_bound) in inner.upper_bounds.iter().enumerate() {
            cumulative += cold.buckets[i].load(Ordering::Relaxed);
            buckets.push(Bucket {
                upper_bound,
                cumulative_count: cumulative,
            });
        }
        let sum = cold.sum.load();

        // Fold the cold shard into the hot one and clear it for the next flip.
        for (c, h) in cold.buckets.iter().zip(hot.buckets.iter()) {
            h.fetch_add(c.swap(0, Ordering::Relaxed), Ordering::Relaxed);
        }
        hot.sum.add(cold.sum.swap(0.0));
        hot.count
            .fetch_add(cold.count.swap(0, Ordering::AcqRel), Ordering::Release);

        HistogramSnapshot {
            buckets,
            sum,
            count,
        }
    }

    fn find_bucket(&self, v: f64) -> usize {
        let bounds = &self.inner.upper_bounds;
        if v.is_nan() {
            return bounds.len();
        }
        if bounds.len() <= LINEAR_SEARCH_MAX {
            bounds.iter().position(|&b| v <= b).unwrap_or(bounds.len())
        } else {
            bounds.partition_point(|&b| b < v)
        }
    }
}

impl Observer for Histogram {
    fn observe(&self, v: f64) {
        Histogram::observe(self, v);
    }
}

impl Collector for Histogram {
    fn desc(&self) -> &Desc {
        &self.inner.desc
    }

    fn collect(&self) -> MetricSnapshot {
        MetricSnapshot::new(&self.inner.desc, SnapshotValue::Histogram(self.snapshot()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn counts(s: &HistogramSnapshot) -> Vec<u64> {
        s.buckets.iter().map(|b| b.cumulative_count).collect()
    }

    #[test]
    fn cumulative_buckets() {
        let h = Histogram::new("h", "help", HistogramOpts::new(vec![0.1, 0.5, 1.0])).unwrap();
        for v in [0.05, 0.3, 2.0] {
            h.observe(v);
        }
        let s = h.snapshot();
        assert_eq!(counts(&s), vec![1, 2, 2]);
        assert_eq!(s.count, 3);
        assert!((s.sum - 2.35).abs() < 1e-12);
    }

    #[test]
    fn boundary_value_is_inclusive() {
        let h = Histogram::new("h", "help", HistogramOpts::new(vec![1.0, 2.0])).unwrap();
        h.observe(1.0);
        h.observe(2.0);
        assert_eq!(counts(&h.snapshot()), vec![1, 2]);
    }

    #[test]
    fn repeated_snapshots_keep_history() {
        let h = Histogram::new("h", "help", HistogramOpts::new(vec![1.0])).unwrap();
        h.observe(0.5);
        assert_eq!(h.snapshot().count, 1);
        h.observe(3.0);
        let s = h.snapshot();
        assert_eq!(s.count, 2);
        assert_eq!(counts(&s), vec![1]);
        assert_eq!(s.sum, 3.5);
        // third snapshot with nothing new in between
        assert_eq!(h.snapshot(), s);
    }

    #[test]
    fn binary_search_matches_linear() {
        let bounds = linear_buckets(0.0, 1.0, 40).unwrap();
        let h = Histogram::new("h", "help", HistogramOpts::new(bounds.clone())).unwrap();
        for i in 0..400 {
            let v = i as f64 * 0.1 - 1.0;
            let linear = bounds.iter().position(|&b| v <= b).unwrap_or(bounds.len());
            assert_eq!(h.find_bucket(v), linear, "v={v}");
        }
        assert_eq!(h.find_bucket(f64::NAN), bounds.len());
        assert_eq!(h.find_bucket(f64::INFINITY), bounds.len());
    }

    #[test]
    fn bucket_validation() {
        let bad = [vec![1.0, 1.0], vec![2.0, 1.0], vec![0.5, f64::NAN]];
        for b in bad {
            let err = Histogram::new("h", "help", HistogramOpts::new(b)).err().unwrap();
            assert_eq!(err.kind().as_str(), "INVALID_ARGUMENT");
        }

        let h = Histogram::new("h", "help", HistogramOpts::new(vec![1.0, f64::INFINITY])).unwrap();
        assert_eq!(h.upper_bounds(), &[1.0]);

        let h = Histogram::new("h", "help", HistogramOpts::new(vec![])).unwrap();
        assert_eq!(h.upper_bounds(), &DEFAULT_BUCKETS[..]);
    }

    #[test]
    fn bucket_helpers() {
        assert_eq!(linear_buckets(1.0, 2.0, 3).unwrap(), vec![1.0, 3.0, 5.0]);
        assert_eq!(exponential_buckets(1.0, 10.0, 3).unwrap(), vec![1.0, 10.0, 100.0]);
        assert!(linear_buckets(1.0, 0.0, 3).is_err());
        assert!(exponential_buckets(0.0, 2.0, 3).is_err());
        assert!(exponential_buckets(1.0, 1.0, 3).is_err());
        assert!(exponential_buckets(1.0, 2.0, 0).is_err());
    }

    #[test]
    fn timer_records_into_histogram() {
        let h = Histogram::new("h", "help", HistogramOpts::default()).unwrap();
        h.start_timer().observe_duration();
        drop(h.start_timer());
        assert_eq!(h.snapshot().count, 2);
    }
}
