//! Fixed expectation policy over (declared, actual) pairs.
//!
//! The baseline rule is simple: a prototype-matching detector should trap
//! exactly the mismatched pairs. Two pairs are exempted from that rule.
//! Both are artifacts of the raw-entry aliasing technique, not general CFI
//! properties; they are kept as named constants rather than re-derived.

use cfieval_catalog::RAW_ENTRY_INDEX;

/// Calling the raw-entry target through its own slot is still expected to
/// trap: execution begins at a non-entry offset inside a larger routine.
pub const RAW_ENTRY_SELF_PAIR: (usize, usize) = (RAW_ENTRY_INDEX, RAW_ENTRY_INDEX);

/// Redirecting the first catalog slot to the raw entry is treated as a
/// legitimate non-trapping call. Documented exemption of the raw-entry
/// aliasing behavior; preserved verbatim.
pub const RAW_ENTRY_ALIAS_PAIR: (usize, usize) = (0, RAW_ENTRY_INDEX);

/// Whether a detector under test should flag the call described by
/// `(declared, actual)`.
#[must_use]
pub fn expect_trap(declared: usize, actual: usize) -> bool {
    if (declared, actual) == RAW_ENTRY_SELF_PAIR {
        return true;
    }
    if (declared, actual) == RAW_ENTRY_ALIAS_PAIR {
        return false;
    }
    declared != actual
}
