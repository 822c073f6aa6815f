//! Shared statistics helpers for the dispatch benchmarks.
//!
//! Each benchmark feeds its batch timings into a [`SampleSet`]; the
//! percentile math lives in [`Summary`] so the benches only ever print a
//! finished summary, never touch raw samples.

use std::time::Duration;

/// Per-batch timing samples for one benchmark.
#[derive(Debug, Default)]
pub struct SampleSet {
    ns_per_op: Vec<f64>,
    ops: u64,
    nanos: u128,
}

/// Quantile summary computed once over a finished [`SampleSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub samples: usize,
    pub p50_ns: f64,
    pub p95_ns: f64,
    pub p99_ns: f64,
    pub mean_ns: f64,
    pub ops_per_sec: f64,
}

impl SampleSet {
    /// Record one batch of `iters` calls that took `elapsed` wall time.
    pub fn push(&mut self, iters: u64, elapsed: Duration) {
        if iters == 0 {
            return;
        }
        let ns = elapsed.as_nanos();
        self.ops = self.ops.saturating_add(iters);
        self.nanos = self.nanos.saturating_add(ns);
        self.ns_per_op.push(ns as f64 / iters as f64);
    }

    /// Summarize the set, or `None` when nothing was recorded.
    #[must_use]
    pub fn summarize(&self) -> Option<Summary> {
        if self.ns_per_op.is_empty() {
            return None;
        }
        let mut sorted = self.ns_per_op.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mean_ns = sorted.iter().sum::<f64>() / sorted.len() as f64;
        let seconds = self.nanos as f64 / 1e9;
        Some(Summary {
            samples: sorted.len(),
            p50_ns: quantile(&sorted, 0.50),
            p95_ns: quantile(&sorted, 0.95),
            p99_ns: quantile(&sorted, 0.99),
            mean_ns,
            ops_per_sec: if seconds > 0.0 {
                self.ops as f64 / seconds
            } else {
                0.0
            },
        })
    }

    /// Print the one-line machine-parseable summary for `label`.
    pub fn print(&self, label: &str) {
        if let Some(s) = self.summarize() {
            println!(
                "DISPATCH_BENCH bench={label} samples={} p50_ns_op={:.3} p95_ns_op={:.3} \
                 p99_ns_op={:.3} mean_ns_op={:.3} throughput_ops_s={:.3}",
                s.samples, s.p50_ns, s.p95_ns, s.p99_ns, s.mean_ns, s.ops_per_sec
            );
        }
    }
}

/// Quantile with linear interpolation between the two closest ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!((0.0..=1.0).contains(&q));
    let position = q * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    let weight = position - below as f64;
    sorted[below] + (sorted[above] - sorted[below]) * weight
}
