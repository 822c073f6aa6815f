//! Safe evaluation engine around the corruption boundary.
//!
//! Drives process-isolated corruption trials over the full
//! (declared, actual) cross product of the catalog, classifies each outcome
//! against the fixed expectation policy, and aggregates precision matrices,
//! probe results, and throughput samples into reports.

pub mod bench;
pub mod classify;
pub mod policy;
pub mod probes;
pub mod report;
pub mod resolver;
pub mod structured_log;
pub mod sweep;
pub mod trial;

pub use bench::{measure, BenchmarkSample, DEFAULT_BENCH_ITERATIONS};
pub use classify::{classify, Classification, Surface};
pub use policy::expect_trap;
pub use probes::{run_probe, Probe, ProbeError, ProbeResult};
pub use report::PrecisionReport;
pub use sweep::{run_sweep, PrecisionMatrix, SweepOptions};
pub use trial::{run_isolated, TrialError, TrialOutcome};
