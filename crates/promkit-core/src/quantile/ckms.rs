use std::mem;

/// A tracked quantile `φ` with its rank error tolerance `ε`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub quantile: f64,
    pub epsilon: f64,
}

/// `(value, g, Δ)`: `g` observations since the previous tuple, `Δ` maximum
/// uncertainty of this tuple's rank.
#[derive(Debug, Clone, Copy)]
struct Tuple {
    value: f64,
    g: u64,
    delta: u64,
}

/// Targeted-quantile sketch.
///
/// Tuples live in one `Vec` ordered by value; neighbours are adjacent
/// indices. Invariant for every tuple `i` with predecessor rank sum `r`:
/// `g_i + Δ_i <= c·f(r, n)`.
///
/// `f` is narrowest (`2εn`) at each target rank and widens with slope at
/// most `s` away from it. Scaling the band by `c = 1 / (1 + s)` keeps the
/// rank error of a target query within `ε·n` on both sides.
#[derive(Debug, Clone)]
pub struct Stream {
    targets: Vec<Target>,
    scale: f64,
    tuples: Vec<Tuple>,
    scratch: Vec<Tuple>,
    n: u64,
}

impl Stream {
    pub fn new(targets: Vec<Target>) -> Self {
        let slope = targets
            .iter()
            .map(|t| {
                let below = 2.0 * t.epsilon / (1.0 - t.quantile);
                let above = 2.0 * t.epsilon / t.quantile;
                below.max(above)
            })
            .fold(0.0, f64::max);

        Self {
            targets,
            scale: 1.0 / (1.0 + slope),
            tuples: Vec::new(),
            scratch: Vec::new(),
            n: 0,
        }
    }

    /// Observations merged so far.
    pub fn count(&self) -> u64 {
        self.n
    }

    /// Number of retained tuples.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn reset(&mut self) {
        self.tuples.clear();
        self.n = 0;
    }

    /// Merge a single observation and compact.
    pub fn insert(&mut self, v: f64) {
        self.merge_sorted(&[v]);
    }

    /// Merge an ascending batch of (non-NaN) observations, then compact once.
    pub fn merge_sorted(&mut self, samples: &[f64]) {
        if samples.is_empty() {
            return;
        }

        let mut out = mem::take(&mut self.scratch);
        out.clear();
        out.reserve(self.tuples.len() + samples.len());

        let mut i = 0;
        let mut r = 0u64;
        for &v in samples {
            while i < self.tuples.len() && self.tuples[i].value <= v {
                r += self.tuples[i].g;
                out.push(self.tuples[i]);
                i += 1;
            }

            // New minimum or maximum: rank is known exactly.
            let delta = if r == 0 || i == self.tuples.len() {
                0
            } else {
                (self.invariant(r as f64).floor() as u64).saturating_sub(1)
            };
            out.push(Tuple { value: v, g: 1, delta });
            r += 1;
            self.n += 1;
        }
        out.extend_from_slice(&self.tuples[i..]);

        self.scratch = mem::replace(&mut self.tuples, out);
        self.compress();
    }

    /// Value whose rank is within the target tolerance of `q·n`.
    /// `NaN` when nothing has been merged.
    pub fn query(&self, q: f64) -> f64 {
        let Some(first) = self.tuples.first() else {
            return f64::NAN;
        };

        let rank = (q * self.n as f64).ceil();
        let bound = rank + self.invariant(rank) / 2.0;

        let mut prev = first;
        let mut r = 0.0;
        for t in &self.tuples[1..] {
            r += prev.g as f64;
            if r + t.g as f64 + t.delta as f64 > bound {
                return prev.value;
            }
            prev = t;
        }
        prev.value
    }

    /// Allowed `g + Δ` for a tuple whose predecessors hold `r` observations.
    fn invariant(&self, r: f64) -> f64 {
        let n = self.n as f64;
        let f = self
            .targets
            .iter()
            .map(|t| {
                if t.quantile * n <= r {
                    2.0 * t.epsilon * r / t.quantile
                } else {
                    2.0 * t.epsilon * (n - r) / (1.0 - t.quantile)
                }
            })
            .fold(f64::MAX, f64::min);
        self.scale * f
    }

    /// Walk from the top, folding a tuple into its successor whenever the
    /// merged tuple still satisfies the invariant. The minimum and maximum
    /// are never folded away.
    fn compress(&mut self) {
        let len = self.tuples.len();
        if len < 3 {
            return;
        }

        let mut out = mem::take(&mut self.scratch);
        out.clear();
        out.push(self.tuples[len - 1]);

        let mut r = self.n - self.tuples[len - 1].g;
        for i in (1..len - 1).rev() {
            let t = self.tuples[i];
            r -= t.g;
            let allowed = self.invariant(r as f64);
            match out.last_mut() {
                Some(next) if (t.g + next.g + next.delta) as f64 <= allowed => next.g += t.g,
                _ => out.push(t),
            }
        }
        out.push(self.tuples[0]);
        out.reverse();

        self.scratch = mem::replace(&mut self.tuples, out);
        tracing::trace!(before = len, after = self.tuples.len(), n = self.n, "quantile sketch compacted");
    }
}
