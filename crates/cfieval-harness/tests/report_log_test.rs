// Report rendering and structured-log round trip, without forking.

use cfieval_catalog::PROTOTYPE_COUNT;
use cfieval_harness::classify::{classify, Classification, Surface};
use cfieval_harness::policy::expect_trap;
use cfieval_harness::report::PrecisionReport;
use cfieval_harness::structured_log::{validate_log_file, LogEmitter, LogEntry, LogLevel};
use cfieval_harness::sweep::{MatrixCell, PrecisionMatrix};
use cfieval_harness::trial::TrialOutcome;

fn perfect_detector_matrix(surface: Surface) -> PrecisionMatrix {
    let mut cells = Vec::new();
    for declared in 0..PROTOTYPE_COUNT {
        for actual in 0..PROTOTYPE_COUNT {
            let expected_trap = expect_trap(declared, actual);
            let outcome = if expected_trap {
                TrialOutcome::Signaled(libc::SIGILL)
            } else {
                TrialOutcome::CleanExit
            };
            cells.push(MatrixCell {
                declared,
                actual,
                expected_trap,
                outcome,
                classification: classify(expected_trap, outcome),
            });
        }
    }
    PrecisionMatrix { surface, cells }
}

#[test]
fn clean_report_renders_both_formats() {
    let mut report = PrecisionReport::new("Forward-edge dispatch precision report");
    report.push_matrix(&perfect_detector_matrix(Surface::Aggregate));
    report.push_matrix(&perfect_detector_matrix(Surface::ScalarPointer));
    assert!(report.is_clean());

    let md = report.to_markdown();
    assert!(md.contains("- Verdict: CLEAN"));
    assert!(md.contains("## Surface: aggregate"));
    assert!(md.contains("## Surface: scalar-pointer"));
    assert!(!md.contains("| Declared |"), "clean report has no findings table");

    let value: serde_json::Value = serde_json::from_str(&report.to_json()).expect("valid JSON");
    assert_eq!(value["surfaces"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        value["surfaces"][0]["total_cells"],
        PROTOTYPE_COUNT * PROTOTYPE_COUNT
    );
}

#[test]
fn sweep_shaped_log_lines_validate() {
    let dir = std::env::temp_dir().join("cfieval-report-log-test");
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join(format!("sweep-{}.jsonl", std::process::id()));

    let emitter = LogEmitter::to_file(&path, "integration-run").expect("emitter");
    let matrix = perfect_detector_matrix(Surface::Aggregate);
    for cell in &matrix.cells {
        emitter
            .emit_entry(
                LogEntry::new(LogLevel::Info, "sweep.cell")
                    .with_surface(matrix.surface)
                    .with_pair(cell.declared, cell.actual)
                    .with_classification(cell.classification),
            )
            .expect("emit");
    }
    emitter
        .emit_entry(
            LogEntry::new(LogLevel::Info, "sweep.done").with_details(serde_json::json!({
                "cells": matrix.cells.len(),
                "clean": matrix.is_clean(),
            })),
        )
        .expect("emit");

    let (lines, errors) = validate_log_file(&path).expect("log readable");
    assert_eq!(lines, PROTOTYPE_COUNT * PROTOTYPE_COUNT + 1);
    assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");

    std::fs::remove_file(&path).ok();
}

#[test]
fn findings_survive_aggregation() {
    let mut matrix = perfect_detector_matrix(Surface::Aggregate);
    // Flip one mismatched pair into a miss.
    let cell = matrix
        .cells
        .iter_mut()
        .find(|c| c.expected_trap)
        .expect("some cell expects a trap");
    cell.outcome = TrialOutcome::CleanExit;
    cell.classification = classify(cell.expected_trap, cell.outcome);
    assert_eq!(cell.classification, Classification::FalseNegative);

    let mut report = PrecisionReport::new("report");
    report.push_matrix(&matrix);
    assert!(!report.is_clean());
    assert!(report.to_markdown().contains("false negative"));
}
