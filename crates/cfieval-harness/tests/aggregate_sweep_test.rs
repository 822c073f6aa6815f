// Full cross-product sweep over the aggregate dispatch surface.
//
// Every trial forks, so this file holds exactly one #[test]: libtest runs
// each integration test binary in its own process, and a single test thread
// keeps the forked children away from locked stdio.

use std::time::Duration;

use cfieval_catalog::{PROTOTYPE_COUNT, RAW_ENTRY_INDEX};
use cfieval_harness::classify::{Classification, Surface};
use cfieval_harness::sweep::{run_sweep, SweepOptions};
use cfieval_harness::trial::TrialOutcome;

#[test]
fn aggregate_sweep_covers_every_pair() {
    let options = SweepOptions {
        timeout: Duration::from_secs(10),
        verbose: false,
        ..SweepOptions::default()
    };
    let matrix = run_sweep(Surface::Aggregate, options, None).expect("sweep should run");

    assert_eq!(matrix.cells.len(), PROTOTYPE_COUNT * PROTOTYPE_COUNT);
    assert_eq!(
        matrix.definite_cells(),
        PROTOTYPE_COUNT * PROTOTYPE_COUNT,
        "no cell should hit the watchdog in an uninstrumented build"
    );

    // Without a forward-edge detector in the build, a matched call is just a
    // correct call; the non-raw diagonal must come back clean.
    for i in 0..RAW_ENTRY_INDEX {
        let cell = matrix.cell(i, i).expect("diagonal cell present");
        assert_eq!(cell.outcome, TrialOutcome::CleanExit, "diagonal index {i}");
        assert_eq!(cell.classification, Classification::TrueNegative);
    }

    // The raw-entry alias redirect lands inside the sled and falls through.
    let alias = matrix.cell(0, RAW_ENTRY_INDEX).expect("alias cell present");
    assert!(!alias.expected_trap);
    assert_eq!(alias.outcome, TrialOutcome::CleanExit);
    assert_eq!(alias.classification, Classification::TrueNegative);

    // The raw-entry self pair is expected to trap by policy even though an
    // uninstrumented sled tolerates it.
    let raw_self = matrix
        .cell(RAW_ENTRY_INDEX, RAW_ENTRY_INDEX)
        .expect("raw self cell present");
    assert!(raw_self.expected_trap);

    let total: usize = [
        Classification::TruePositive,
        Classification::TrueNegative,
        Classification::FalseNegative,
        Classification::FalsePositive,
        Classification::TimedOut,
    ]
    .into_iter()
    .map(|c| matrix.count(c))
    .sum();
    assert_eq!(total, matrix.cells.len());
}
