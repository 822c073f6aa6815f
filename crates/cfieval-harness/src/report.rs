//! Report generation for precision and throughput results.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use cfieval_catalog::Prototype;

use crate::bench::BenchmarkSample;
use crate::classify::Classification;
use crate::probes::ProbeResult;
use crate::sweep::PrecisionMatrix;

/// One reportable cell, rendered with signature strings instead of indices.
#[derive(Debug, Clone, Serialize)]
pub struct CellFinding {
    pub declared: String,
    pub actual: String,
    pub classification: Classification,
}

/// Aggregated verdict counts for one dispatch surface.
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceSummary {
    pub surface: String,
    pub total_cells: usize,
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    pub false_positives: usize,
    pub timed_out: usize,
    pub clean: bool,
    pub findings: Vec<CellFinding>,
}

impl SurfaceSummary {
    #[must_use]
    pub fn from_matrix(matrix: &PrecisionMatrix) -> Self {
        let findings = matrix
            .cells
            .iter()
            .filter(|c| c.classification.is_reportable())
            .map(|c| CellFinding {
                declared: Prototype::from_index(c.declared)
                    .map_or_else(|| c.declared.to_string(), |p| p.signature().to_string()),
                actual: Prototype::from_index(c.actual)
                    .map_or_else(|| c.actual.to_string(), |p| p.signature().to_string()),
                classification: c.classification,
            })
            .collect();
        SurfaceSummary {
            surface: matrix.surface.label().to_string(),
            total_cells: matrix.cells.len(),
            true_positives: matrix.count(Classification::TruePositive),
            true_negatives: matrix.count(Classification::TrueNegative),
            false_negatives: matrix.count(Classification::FalseNegative),
            false_positives: matrix.count(Classification::FalsePositive),
            timed_out: matrix.count(Classification::TimedOut),
            clean: matrix.is_clean(),
            findings,
        }
    }
}

/// Full evaluation report: precision matrices, probes, and throughput.
#[derive(Debug, Serialize)]
pub struct PrecisionReport {
    pub title: String,
    pub timestamp_ms: u128,
    pub surfaces: Vec<SurfaceSummary>,
    pub probes: Vec<ProbeResult>,
    pub benchmark: Option<BenchmarkSample>,
}

impl PrecisionReport {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        PrecisionReport {
            title: title.into(),
            timestamp_ms,
            surfaces: Vec::new(),
            probes: Vec::new(),
            benchmark: None,
        }
    }

    pub fn push_matrix(&mut self, matrix: &PrecisionMatrix) {
        self.surfaces.push(SurfaceSummary::from_matrix(matrix));
    }

    pub fn push_probe(&mut self, probe: ProbeResult) {
        self.probes.push(probe);
    }

    pub fn set_benchmark(&mut self, sample: BenchmarkSample) {
        self.benchmark = Some(sample);
    }

    /// True when every surface is clean and every probe matched its
    /// expectation.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.surfaces.iter().all(|s| s.clean)
            && self
                .probes
                .iter()
                .all(|p| !p.classification.is_reportable())
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Timestamp (ms): {}\n", self.timestamp_ms));
        out.push_str(&format!(
            "- Verdict: {}\n\n",
            if self.is_clean() { "CLEAN" } else { "FINDINGS" }
        ));

        for surface in &self.surfaces {
            out.push_str(&format!("## Surface: {}\n\n", surface.surface));
            out.push_str(&format!("- Cells: {}\n", surface.total_cells));
            out.push_str(&format!("- True positives: {}\n", surface.true_positives));
            out.push_str(&format!("- True negatives: {}\n", surface.true_negatives));
            out.push_str(&format!("- False negatives: {}\n", surface.false_negatives));
            out.push_str(&format!("- False positives: {}\n", surface.false_positives));
            out.push_str(&format!("- Timed out: {}\n\n", surface.timed_out));
            if !surface.findings.is_empty() {
                out.push_str("| Declared | Actual | Verdict |\n");
                out.push_str("|----------|--------|---------|\n");
                for f in &surface.findings {
                    out.push_str(&format!(
                        "| `{}` | `{}` | {} |\n",
                        f.declared,
                        f.actual,
                        f.classification.label()
                    ));
                }
                out.push('\n');
            }
        }

        if !self.probes.is_empty() {
            out.push_str("## Probes\n\n");
            out.push_str("| Probe | Expected trap | Outcome | Verdict |\n");
            out.push_str("|-------|---------------|---------|---------|\n");
            for p in &self.probes {
                out.push_str(&format!(
                    "| {} | {} | {:?} | {} |\n",
                    p.probe.label(),
                    p.expected_trap,
                    p.outcome,
                    p.classification.label()
                ));
            }
            out.push('\n');
        }

        if let Some(sample) = &self.benchmark {
            out.push_str("## Throughput\n\n");
            out.push_str(&format!("- Iterations: {}\n", sample.iterations));
            out.push_str(&format!("- Elapsed cycles: {}\n", sample.elapsed_cycles));
            out.push_str(&format!(
                "- Cycles per dispatch: {:.6}\n",
                sample.cycles_per_dispatch
            ));
        }

        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
