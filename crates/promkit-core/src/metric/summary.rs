//! Windowed quantile summary.
//!
//! `age_buckets` sketches all receive every observation. The oldest ("head")
//! sketch answers queries and is reset every `max_age / age_buckets`, so a
//! quantile covers between `max_age - max_age/age_buckets` and `max_age` of
//! history. `sum` and `count` are all-time and never decay.
//!
//! One mutex per summary serialises observe, compaction and query. This is
//! the price of bounded-memory quantiles: summaries are slower to observe
//! than histograms and should not sit on very hot paths.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::clock::{Clock, SystemClock};
use crate::desc::{Desc, MetricKind};
use crate::error::{MetricsError, Result};
use crate::quantile::{Stream, Target};
use crate::snapshot::{MetricSnapshot, QuantileValue, SnapshotValue, SummarySnapshot};

use super::{Collector, Observer, Timer};

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_AGE_BUCKETS: u32 = 5;
pub const DEFAULT_BUF_CAP: usize = 500;
/// Upper limit on `age_buckets`; each bucket is a full sketch.
pub const MAX_AGE_BUCKETS: u32 = 1_000;

/// Quantile `quantile` tracked with rank error `error`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Objective {
    pub quantile: f64,
    pub error: f64,
}

impl Objective {
    pub fn new(quantile: f64, error: f64) -> Self {
        Self { quantile, error }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryOpts {
    /// Empty means only `_sum` and `_count` are exported.
    #[serde(default)]
    pub objectives: Vec<Objective>,

    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,

    #[serde(default = "default_age_buckets")]
    pub age_buckets: u32,

    /// Observations buffered before they are merged into the sketches.
    #[serde(default = "default_buf_cap")]
    pub buf_cap: usize,
}

impl Default for SummaryOpts {
    fn default() -> Self {
        Self {
            objectives: Vec::new(),
            max_age_ms: default_max_age_ms(),
            age_buckets: default_age_buckets(),
            buf_cap: default_buf_cap(),
        }
    }
}

impl SummaryOpts {
    pub fn with_objectives(objectives: Vec<Objective>) -> Self {
        Self {
            objectives,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for o in &self.objectives {
            if !(o.quantile > 0.0 && o.quantile < 1.0) {
                return Err(MetricsError::InvalidArgument(format!(
                    "summary quantile {} must be in (0, 1)",
                    o.quantile
                )));
            }
            if !(o.error >= 0.0 && o.error < 1.0) {
                return Err(MetricsError::InvalidArgument(format!(
                    "summary error {} for quantile {} must be in [0, 1)",
                    o.error, o.quantile
                )));
            }
        }
        let mut qs: Vec<f64> = self.objectives.iter().map(|o| o.quantile).collect();
        qs.sort_by(f64::total_cmp);
        if let Some(w) = qs.windows(2).find(|w| w[0] == w[1]) {
            return Err(MetricsError::InvalidArgument(format!(
                "summary quantile {} listed twice",
                w[0]
            )));
        }

        if self.max_age_ms == 0 {
            return Err(MetricsError::InvalidArgument(
                "summary max_age_ms must be positive".into(),
            ));
        }
        if self.age_buckets == 0 || self.age_buckets > MAX_AGE_BUCKETS {
            return Err(MetricsError::InvalidArgument(format!(
                "summary age_buckets must be between 1 and {MAX_AGE_BUCKETS}"
            )));
        }
        if self.stream_duration().is_zero() {
            return Err(MetricsError::InvalidArgument(format!(
                "summary max_age_ms {} is too short for {} age buckets",
                self.max_age_ms, self.age_buckets
            )));
        }
        if self.buf_cap == 0 {
            return Err(MetricsError::InvalidArgument(
                "summary buf_cap must be positive".into(),
            ));
        }
        Ok(())
    }

    fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    fn stream_duration(&self) -> Duration {
        self.max_age() / self.age_buckets
    }
}

fn default_max_age_ms() -> u64 {
    DEFAULT_MAX_AGE.as_millis() as u64
}
fn default_age_buckets() -> u32 {
    DEFAULT_AGE_BUCKETS
}
fn default_buf_cap() -> usize {
    DEFAULT_BUF_CAP
}

#[derive(Clone)]
pub struct Summary {
    inner: Arc<SummaryInner>,
}

struct SummaryInner {
    desc: Desc,
    // ascending by quantile
    objectives: Vec<Objective>,
    clock: Arc<dyn Clock>,
    core: Mutex<SummaryCore>,
}

struct SummaryCore {
    streams: Vec<Stream>,
    head: usize,
    head_expires: Instant,
    stream_duration: Duration,
    max_age: Duration,
    buf: Vec<f64>,
    buf_cap: usize,
    sum: f64,
    count: u64,
}

impl SummaryCore {
    /// Sort the buffer once and merge it into every sketch.
    fn flush(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        self.buf.sort_by(f64::total_cmp);
        for s in &mut self.streams {
            s.merge_sorted(&self.buf);
        }
        self.buf.clear();
    }

    fn maybe_rotate(&mut self, now: Instant) {
        if now < self.head_expires {
            return;
        }
        self.flush();
        if now.saturating_duration_since(self.head_expires) >= self.max_age {
            // Idle for a whole window: everything has aged out.
            for s in &mut self.streams {
                s.reset();
            }
            self.head_expires = now + self.stream_duration;
            tracing::trace!(head = self.head, "summary window expired");
            return;
        }
        // Lag is below `max_age`, so this takes about `age_buckets` steps at most.
        while now >= self.head_expires {
            self.streams[self.head].reset();
            self.head = (self.head + 1) % self.streams.len();
            self.head_expires += self.stream_duration;
        }
        tracing::trace!(head = self.head, "summary window rotated");
    }

    fn quantile(&self, q: f64) -> f64 {
        self.streams
            .get(self.head)
            .map(|s| s.query(q))
            .unwrap_or(f64::NAN)
    }
}

impl Summary {
    pub fn new(name: impl Into<String>, help: impl Into<String>, opts: SummaryOpts) -> Result<Self> {
        Self::with_clock(name, help, opts, Arc::new(SystemClock))
    }

    pub fn with_clock(
        name: impl Into<String>,
        help: impl Into<String>,
        opts: SummaryOpts,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        opts.validate()?;

        let mut objectives = opts.objectives.clone();
        objectives.sort_by(|a, b| a.quantile.total_cmp(&b.quantile));

        let streams = if objectives.is_empty() {
            Vec::new()
        } else {
            let targets: Vec<Target> = objectives
                .iter()
                .map(|o| Target {
                    quantile: o.quantile,
                    epsilon: o.error,
                })
                .collect();
            (0..opts.age_buckets)
                .map(|_| Stream::new(targets.clone()))
                .collect()
        };

        let stream_duration = opts.stream_duration();
        let core = SummaryCore {
            streams,
            head: 0,
            head_expires: clock.now() + stream_duration,
            stream_duration,
            max_age: opts.max_age(),
            buf: Vec::with_capacity(opts.buf_cap),
            buf_cap: opts.buf_cap,
            sum: 0.0,
            count: 0,
        };

        Ok(Self {
            inner: Arc::new(SummaryInner {
                desc: Desc::new(name, help, MetricKind::Summary),
                objectives,
                clock,
                core: Mutex::new(core),
            }),
        })
    }

    /// Objectives in ascending quantile order.
    pub fn objectives(&self) -> &[Objective] {
        &self.inner.objectives
    }

    pub fn observe(&self, v: f64) {
        let now = self.inner.clock.now();
        let mut core = self.lock();
        core.sum += v;
        core.count += 1;

        if core.streams.is_empty() {
            return;
        }
        core.maybe_rotate(now);
        // NaN has no rank; it only shows up in sum/count.
        if !v.is_nan() {
            core.buf.push(v);
            if core.buf.len() >= core.buf_cap {
                core.flush();
            }
        }
    }

    /// Estimate of the `q` quantile over the retained window. `NaN` if the
    /// window is empty or no objectives are configured.
    pub fn quantile(&self, q: f64) -> f64 {
        let now = self.inner.clock.now();
        let mut core = self.lock();
        if core.streams.is_empty() {
            return f64::NAN;
        }
        core.maybe_rotate(now);
        core.flush();
        core.quantile(q)
    }

    pub fn start_timer(&self) -> Timer<'_, Self> {
        Timer::new(self)
    }

    pub fn snapshot(&self) -> SummarySnapshot {
        let now = self.inner.clock.now();
        let mut core = self.lock();
        if !core.streams.is_empty() {
            core.maybe_rotate(now);
            core.flush();
        }

        let quantiles = self
            .inner
            .objectives
            .iter()
            .map(|o| QuantileValue {
                quantile: o.quantile,
                value: core.quantile(o.quantile),
            })
            .collect();

        SummarySnapshot {
            quantiles,
            sum: core.sum,
            count: core.count,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SummaryCore> {
        self.inner.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Observer for Summary {
    fn observe(&self, v: f64) {
        Summary::observe(self, v);
    }
}

impl Collector for Summary {
    fn desc(&self) -> &Desc {
        &self.inner.desc
    }

    fn collect(&self) -> MetricSnapshot {
        MetricSnapshot::new(&self.inner.desc, SnapshotValue::Summary(self.snapshot()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::clock::ManualClock;

    fn windowed(clock: &Arc<ManualClock>) -> Summary {
        let opts = SummaryOpts {
            objectives: vec![Objective::new(0.5, 0.05)],
            max_age_ms: 10_000,
            age_buckets: 5,
            buf_cap: 4,
        };
        Summary::with_clock("s", "help", opts, clock.clone()).unwrap()
    }

    #[test]
    fn without_objectives_only_sum_and_count() {
        let s = Summary::new("s", "help", SummaryOpts::default()).unwrap();
        s.observe(1.5);
        s.observe(2.5);
        let snap = s.snapshot();
        assert!(snap.quantiles.is_empty());
        assert_eq!(snap.sum, 4.0);
        assert_eq!(snap.count, 2);
        assert!(s.quantile(0.5).is_nan());
    }

    #[test]
    fn median_of_small_stream() {
        let opts = SummaryOpts::with_objectives(vec![Objective::new(0.9, 0.01), Objective::new(0.5, 0.05)]);
        let s = Summary::new("s", "help", opts).unwrap();
        for v in 1..=100 {
            s.observe(v as f64);
        }
        let snap = s.snapshot();
        // sorted by quantile regardless of configuration order
        assert_eq!(snap.quantiles[0].quantile, 0.5);
        assert_eq!(snap.quantiles[1].quantile, 0.9);
        assert!((45.0..=55.0).contains(&snap.quantiles[0].value));
        assert!((89.0..=91.0).contains(&snap.quantiles[1].value));
        assert_eq!(snap.count, 100);
        assert_eq!(snap.sum, 5050.0);
    }

    #[test]
    fn empty_window_is_nan() {
        let clock = Arc::new(ManualClock::new());
        let s = windowed(&clock);
        assert!(s.quantile(0.5).is_nan());
    }

    #[test]
    fn old_observations_age_out() {
        let clock = Arc::new(ManualClock::new());
        let s = windowed(&clock);

        for _ in 0..10 {
            s.observe(1.0);
        }
        clock.advance(Duration::from_secs(5));
        for _ in 0..10 {
            s.observe(9.0);
        }
        // head still covers both batches
        assert_eq!(s.quantile(0.5), 1.0);

        clock.advance(Duration::from_secs(6));
        // the 1.0 batch has rotated out
        assert_eq!(s.quantile(0.5), 9.0);

        clock.advance(Duration::from_secs(10));
        let snap = s.snapshot();
        assert!(snap.quantiles[0].value.is_nan());
        // sum/count never decay
        assert_eq!(snap.count, 20);
        assert_eq!(snap.sum, 100.0);
    }

    #[test]
    fn nan_counts_but_is_not_ranked() {
        let clock = Arc::new(ManualClock::new());
        let s = windowed(&clock);
        s.observe(2.0);
        s.observe(f64::NAN);
        assert_eq!(s.quantile(0.5), 2.0);
        let snap = s.snapshot();
        assert_eq!(snap.count, 2);
        assert!(snap.sum.is_nan());
    }

    #[test]
    fn long_idle_resets_in_one_step() {
        let clock = Arc::new(ManualClock::new());
        let opts = SummaryOpts {
            objectives: vec![Objective::new(0.5, 0.05)],
            max_age_ms: 1_000,
            age_buckets: MAX_AGE_BUCKETS,
            buf_cap: 4,
        };
        let s = Summary::with_clock("s", "help", opts, clock.clone()).unwrap();
        s.observe(3.0);
        assert_eq!(s.quantile(0.5), 3.0);

        // a billion seconds is 10^12 one-millisecond buckets
        clock.advance(Duration::from_secs(1_000_000_000));
        assert!(s.quantile(0.5).is_nan());

        s.observe(7.0);
        assert_eq!(s.quantile(0.5), 7.0);
        let snap = s.snapshot();
        assert_eq!(snap.count, 2);
        assert_eq!(snap.sum, 10.0);
    }

    #[test]
    fn idle_shorter_than_window_keeps_recent_buckets() {
        let clock = Arc::new(ManualClock::new());
        let s = windowed(&clock);
        s.observe(4.0);
        // 9.9s lag on a 10s window with 2s buckets: data from t=0 is
        // still inside the newest bucket's span
        clock.advance(Duration::from_millis(9_900));
        assert_eq!(s.quantile(0.5), 4.0);
    }

    #[test]
    fn zero_length_buckets_are_rejected() {
        let tiny = SummaryOpts {
            objectives: vec![Objective::new(0.5, 0.05)],
            max_age_ms: 1,
            age_buckets: 1_000_001,
            buf_cap: 10,
        };
        let err = Summary::new("s", "help", tiny).err().unwrap();
        assert_eq!(err.kind().as_str(), "INVALID_ARGUMENT");

        let max = SummaryOpts {
            max_age_ms: 1,
            age_buckets: MAX_AGE_BUCKETS,
            ..SummaryOpts::default()
        };
        assert!(max.validate().is_ok());
    }

    #[test]
    fn opts_validation() {
        let bad = [
            SummaryOpts::with_objectives(vec![Objective::new(0.0, 0.01)]),
            SummaryOpts::with_objectives(vec![Objective::new(1.0, 0.01)]),
            SummaryOpts::with_objectives(vec![Objective::new(0.5, 1.5)]),
            SummaryOpts::with_objectives(vec![Objective::new(0.5, 0.1), Objective::new(0.5, 0.01)]),
            SummaryOpts { max_age_ms: 0, ..SummaryOpts::default() },
            SummaryOpts { age_buckets: 0, ..SummaryOpts::default() },
            SummaryOpts { buf_cap: 0, ..SummaryOpts::default() },
        ];
        for opts in bad {
            let err = Summary::new("s", "help", opts).err().unwrap();
            assert_eq!(err.kind().as_str(), "INVALID_ARGUMENT");
        }
    }
}
