//! Equivalence-class probes beyond the prototype cross product.
//!
//! Both probes corrupt a single known-good unit pointer by a byte
//! displacement that stays inside the `extern "C" fn()` signature class,
//! and both expect a trap:
//!
//! - same-signature: the redirect lands on an address-taken twin of the
//!   original target. A prototype-matching detector cannot tell the two
//!   apart, so a clean exit here is a reportable precision gap, not a
//!   tolerated call.
//! - not-address-taken: the redirect lands on a routine whose address is
//!   never taken, which even a coarse address-taken-set detector must
//!   reject.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use cfieval_catalog::targets;
use cfieval_inject::dispatch_corrupted_single;

use crate::classify::{classify, Classification};
use crate::resolver::{self, ResolveError};
use crate::trial::{run_isolated, TrialError, TrialOutcome};

/// Identity of one equivalence-class probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Probe {
    SameSignature,
    NotAddressTaken,
}

impl Probe {
    /// Symbol the corrupted pointer is redirected to.
    #[must_use]
    pub const fn target_symbol(self) -> &'static str {
        match self {
            Probe::SameSignature => "unit_from_unit_twin",
            Probe::NotAddressTaken => "unit_from_unit_hidden",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Probe::SameSignature => "same-signature",
            Probe::NotAddressTaken => "not-address-taken",
        }
    }
}

/// Outcome of one probe run. `expected_trap` is always true; it is carried
/// so probe rows classify and report through the same path as sweep cells.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProbeResult {
    pub probe: Probe,
    pub expected_trap: bool,
    pub displacement: isize,
    pub outcome: TrialOutcome,
    pub classification: Classification,
}

/// Failure to run a probe at all.
#[derive(Debug)]
pub enum ProbeError {
    Resolve(ResolveError),
    Trial(TrialError),
    SelfExe(std::io::Error),
    /// Both routines landed at the same address; corrupting by zero would
    /// silently probe nothing.
    ZeroDisplacement(Probe),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Resolve(e) => write!(f, "symbol resolution failed: {e}"),
            ProbeError::Trial(e) => write!(f, "trial failed: {e}"),
            ProbeError::SelfExe(e) => write!(f, "cannot locate own binary: {e}"),
            ProbeError::ZeroDisplacement(probe) => {
                write!(f, "{} probe resolved a zero displacement", probe.label())
            }
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Resolve(e) => Some(e),
            ProbeError::Trial(e) => Some(e),
            ProbeError::SelfExe(e) => Some(e),
            ProbeError::ZeroDisplacement(_) => None,
        }
    }
}

impl From<ResolveError> for ProbeError {
    fn from(e: ResolveError) -> Self {
        ProbeError::Resolve(e)
    }
}

impl From<TrialError> for ProbeError {
    fn from(e: TrialError) -> Self {
        ProbeError::Trial(e)
    }
}

/// Byte displacement for `probe`, from the base unit target to the probe's
/// routine.
///
/// The twin's displacement comes from runtime fn-pointer values: taking its
/// address here is what puts it in the program's address-taken set, the
/// property the probe exists to contrast. The hidden routine's address must
/// never be taken by Rust code, so that displacement comes from the
/// resolver instead.
pub fn probe_displacement(probe: Probe) -> Result<isize, ProbeError> {
    let displacement = match probe {
        Probe::SameSignature => (targets::unit_from_unit_twin as usize as isize)
            .wrapping_sub(targets::unit_from_unit as usize as isize),
        Probe::NotAddressTaken => {
            let binary = resolver::self_exe().map_err(ProbeError::SelfExe)?;
            resolver::resolve_displacement(&binary, "unit_from_unit", probe.target_symbol())?
        }
    };
    if displacement == 0 {
        return Err(ProbeError::ZeroDisplacement(probe));
    }
    Ok(displacement)
}

/// Run one probe in a forked child and classify the result.
pub fn run_probe(probe: Probe, timeout: Duration) -> Result<ProbeResult, ProbeError> {
    cfieval_catalog::init();
    let displacement = probe_displacement(probe)?;
    let outcome = run_isolated(
        // SAFETY: the corrupted call runs in a forked child whose image is
        // discarded afterwards.
        || unsafe { dispatch_corrupted_single(displacement) },
        timeout,
    )?;
    Ok(ProbeResult {
        probe,
        expected_trap: true,
        displacement,
        outcome,
        classification: classify(true, outcome),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Fork-heavy probe runs live in the integration tests; only the
    // identity surface is checked here.

    #[test]
    fn probe_targets_are_distinct_symbols() {
        assert_ne!(
            Probe::SameSignature.target_symbol(),
            Probe::NotAddressTaken.target_symbol()
        );
    }

    #[test]
    fn zero_displacement_is_an_error_not_a_run() {
        let err = ProbeError::ZeroDisplacement(Probe::NotAddressTaken);
        assert!(err.to_string().contains("zero displacement"));
    }

    #[test]
    fn twin_displacement_comes_from_runtime_addresses() {
        // No disassembly tooling involved: the twin's displacement is plain
        // pointer arithmetic over address-taken routines.
        let expected = (targets::unit_from_unit_twin as usize as isize)
            .wrapping_sub(targets::unit_from_unit as usize as isize);
        let got = probe_displacement(Probe::SameSignature).expect("twin displacement");
        assert_eq!(got, expected);
        assert_ne!(got, 0);
    }
}
