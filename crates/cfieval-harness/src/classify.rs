//! Outcome classification against the expectation policy.

use serde::{Deserialize, Serialize};

use crate::trial::TrialOutcome;

/// Which call-site shape a trial went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Aggregate,
    ScalarPointer,
}

impl Surface {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Surface::Aggregate => "aggregate",
            Surface::ScalarPointer => "scalar-pointer",
        }
    }
}

/// One cell's verdict: observed termination compared to the expectation.
///
/// `TimedOut` is its own bucket: a killed hung child proves neither a trap
/// nor a tolerated call, so it is reported separately instead of being
/// folded into either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    TruePositive,
    TrueNegative,
    FalseNegative,
    FalsePositive,
    TimedOut,
}

impl Classification {
    /// True for every verdict that must be surfaced as a diagnostic.
    #[must_use]
    pub fn is_reportable(self) -> bool {
        matches!(
            self,
            Classification::FalseNegative | Classification::FalsePositive | Classification::TimedOut
        )
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Classification::TruePositive => "true positive",
            Classification::TrueNegative => "true negative",
            Classification::FalseNegative => "false negative",
            Classification::FalsePositive => "false positive",
            Classification::TimedOut => "timed out",
        }
    }
}

/// Compare one observed outcome against the expected one.
#[must_use]
pub fn classify(expect_trap: bool, outcome: TrialOutcome) -> Classification {
    match (outcome, expect_trap) {
        (TrialOutcome::TimedOut, _) => Classification::TimedOut,
        (TrialOutcome::CleanExit, true) => Classification::FalseNegative,
        (TrialOutcome::CleanExit, false) => Classification::TrueNegative,
        (_, true) => Classification::TruePositive,
        (_, false) => Classification::FalsePositive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_covers_all_quadrants() {
        assert_eq!(
            classify(true, TrialOutcome::Signaled(libc::SIGSEGV)),
            Classification::TruePositive
        );
        assert_eq!(
            classify(false, TrialOutcome::CleanExit),
            Classification::TrueNegative
        );
        assert_eq!(
            classify(true, TrialOutcome::CleanExit),
            Classification::FalseNegative
        );
        assert_eq!(
            classify(false, TrialOutcome::Signaled(libc::SIGILL)),
            Classification::FalsePositive
        );
    }

    #[test]
    fn timeouts_stay_in_their_own_bucket() {
        assert_eq!(classify(true, TrialOutcome::TimedOut), Classification::TimedOut);
        assert_eq!(classify(false, TrialOutcome::TimedOut), Classification::TimedOut);
    }

    #[test]
    fn nonzero_exit_counts_as_abnormal() {
        assert_eq!(
            classify(true, TrialOutcome::Exited(70)),
            Classification::TruePositive
        );
    }
}
