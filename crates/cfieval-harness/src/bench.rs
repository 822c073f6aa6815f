//! Dispatch throughput probe.
//!
//! Times a tight loop of indirect calls through a volatile-reloaded pointer
//! with the hardware cycle counter and reports cycles per dispatch. The
//! reload forces a genuine indirect call each iteration; a detector's
//! forward-edge check, if any, sits on exactly that path.

use core::ffi::c_int;
use core::ptr::{addr_of, read_volatile};
use std::hint::black_box;

use serde::Serialize;

use cfieval_inject::cycle_count;

/// Iteration count of the reference harness.
pub const DEFAULT_BENCH_ITERATIONS: u64 = 1_000_000_000;

/// Call-site type of the throughput target.
pub type BenchTarget = extern "C" fn(c_int, c_int) -> c_int;

/// One timed run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BenchmarkSample {
    pub iterations: u64,
    pub elapsed_cycles: u64,
    pub cycles_per_dispatch: f64,
}

impl BenchmarkSample {
    /// Console line of the reference harness.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Execution time: cycles {:.6} per dispatch",
            self.cycles_per_dispatch
        )
    }
}

/// Time `iterations` indirect calls of `target(a, b)`.
///
/// A zero request is clamped to one call; the per-dispatch rate must stay
/// finite and positive.
pub fn measure(target: BenchTarget, a: c_int, b: c_int, iterations: u64) -> BenchmarkSample {
    let iterations = iterations.max(1);
    let slot: BenchTarget = target;
    let start = cycle_count();
    for _ in 0..iterations {
        // SAFETY: `slot` is a live local initialized above; the volatile
        // read keeps the call indirect instead of folding to `target`.
        let f = unsafe { read_volatile(addr_of!(slot)) };
        black_box(f(a, b));
    }
    let elapsed_cycles = cycle_count().wrapping_sub(start);
    BenchmarkSample {
        iterations,
        elapsed_cycles,
        cycles_per_dispatch: elapsed_cycles as f64 / iterations as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfieval_catalog::targets::combine_ints;

    #[test]
    fn short_run_produces_a_positive_rate() {
        let sample = measure(combine_ints, 6, 7, 10_000);
        assert_eq!(sample.iterations, 10_000);
        assert!(sample.elapsed_cycles > 0);
        assert!(sample.cycles_per_dispatch > 0.0);
    }

    #[test]
    fn rate_does_not_drift_with_iteration_count() {
        // Loose agreement bound: the per-dispatch rate must not scale with
        // the iteration count, only wander with scheduling noise.
        let short = measure(combine_ints, 6, 7, 50_000);
        let long = measure(combine_ints, 6, 7, 200_000);
        let ratio = short.cycles_per_dispatch / long.cycles_per_dispatch;
        assert!(
            (0.05..20.0).contains(&ratio),
            "short {} vs long {}",
            short.cycles_per_dispatch,
            long.cycles_per_dispatch
        );
    }

    #[test]
    fn zero_iterations_clamp_to_one_call() {
        let sample = measure(combine_ints, 6, 7, 0);
        assert_eq!(sample.iterations, 1);
        assert!(sample.cycles_per_dispatch.is_finite());
        assert!(sample.cycles_per_dispatch > 0.0);
    }

    #[test]
    fn summary_carries_the_rate() {
        let sample = BenchmarkSample {
            iterations: 100,
            elapsed_cycles: 250,
            cycles_per_dispatch: 2.5,
        };
        assert_eq!(sample.summary(), "Execution time: cycles 2.500000 per dispatch");
    }
}
