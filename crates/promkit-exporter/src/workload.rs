//! Demo workload: synthetic traffic so the endpoint has something to show.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::app_state::{AppState, Instrument};

/// Apply one round of traffic to every instrument.
pub fn tick<R: Rng>(state: &AppState, rng: &mut R) {
    let w = &state.cfg().workload;
    for instrument in state.instruments() {
        match instrument {
            Instrument::Counter(c) => c.inc(),
            Instrument::Gauge(g) => {
                let v = rng.random_range(w.gauge_min..w.gauge_max);
                if let Err(e) = g.set(v) {
                    tracing::warn!(error = %e, "gauge update rejected");
                }
            }
            Instrument::Histogram(h) => h.observe(rng.random_range(0.0..w.observe_max)),
            Instrument::Summary(s) => s.observe(rng.random_range(0.0..w.observe_max)),
        }
    }
}

/// Run forever at the configured interval.
pub async fn run(state: AppState) {
    let mut rng = StdRng::from_os_rng();
    let mut ticker = tokio::time::interval(Duration::from_millis(state.cfg().workload.interval_ms));
    loop {
        ticker.tick().await;
        tick(&state, &mut rng);
        tracing::trace!("workload tick");
    }
}
