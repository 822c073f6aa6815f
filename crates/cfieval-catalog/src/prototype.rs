//! Prototype identities: one variant per call-signature class.
//!
//! The variant order is load-bearing. The same index identifies the same
//! prototype across the catalog, both dispatch surfaces, and the address
//! table; [`crate::surfaces`] is laid out field-for-field in this order.

use core::ffi::{c_int, c_void};

use serde::Serialize;

use crate::values::{Overlay, Pair, Selector};

/// Call-site type of prototype 0, 1, and (nominally) 16.
pub type UnitFn = extern "C" fn();
/// Call-site type of the raw-entry slot; entered at a non-zero offset.
pub type RawEntryFn = unsafe extern "C" fn();
pub type UnitIntFn = extern "C" fn(c_int);
pub type UnitSelectorFn = extern "C" fn(Selector);
pub type UnitFloatFn = extern "C" fn(f32);
pub type UnitPairFn = extern "C" fn(Pair);
pub type UnitRawPtrFn = extern "C" fn(*mut c_void);
pub type UnitPairPtrFn = extern "C" fn(*mut Pair);
pub type UnitOverlayFn = extern "C" fn(Overlay);
pub type UnitVariadicFn = unsafe extern "C" fn(c_int, ...);
pub type IntFn = extern "C" fn() -> c_int;
pub type IntIntFn = extern "C" fn(c_int) -> c_int;
pub type FloatFn = extern "C" fn() -> f32;
pub type FloatIntFn = extern "C" fn(c_int) -> f32;
pub type PtrFn = extern "C" fn() -> *mut c_int;
pub type PtrIntFn = extern "C" fn(c_int) -> *mut c_int;

/// Number of prototypes in the catalog.
pub const PROTOTYPE_COUNT: usize = 17;

/// Index of the raw-entry prototype (always last).
pub const RAW_ENTRY_INDEX: usize = PROTOTYPE_COUNT - 1;

/// Identity for one call-signature class.
///
/// `UnitFromUnitLegacy` carries the same Rust type as `UnitFromUnit`; it
/// preserves the unprototyped declaration form of the reference catalog as a
/// distinct entry. `RawEntry` shares the unit signature but its recorded
/// address begins [`crate::surfaces::RAW_ENTRY_SKEW`] bytes inside a larger
/// routine, so even a "correct" call through it is unsafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(usize)]
pub enum Prototype {
    UnitFromUnit = 0,
    UnitFromUnitLegacy,
    UnitFromInt,
    UnitFromSelector,
    UnitFromFloat,
    UnitFromPair,
    UnitFromRawPtr,
    UnitFromPairPtr,
    UnitFromOverlay,
    UnitVariadic,
    IntFromUnit,
    IntFromInt,
    FloatFromUnit,
    FloatFromInt,
    PtrFromUnit,
    PtrFromInt,
    RawEntry,
}

impl Prototype {
    /// All prototypes in catalog index order.
    pub const ALL: [Prototype; PROTOTYPE_COUNT] = [
        Prototype::UnitFromUnit,
        Prototype::UnitFromUnitLegacy,
        Prototype::UnitFromInt,
        Prototype::UnitFromSelector,
        Prototype::UnitFromFloat,
        Prototype::UnitFromPair,
        Prototype::UnitFromRawPtr,
        Prototype::UnitFromPairPtr,
        Prototype::UnitFromOverlay,
        Prototype::UnitVariadic,
        Prototype::IntFromUnit,
        Prototype::IntFromInt,
        Prototype::FloatFromUnit,
        Prototype::FloatFromInt,
        Prototype::PtrFromUnit,
        Prototype::PtrFromInt,
        Prototype::RawEntry,
    ];

    /// Catalog index of this prototype.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a prototype by catalog index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Prototype> {
        Self::ALL.get(index).copied()
    }

    /// Human-readable signature string used in diagnostics and reports.
    #[must_use]
    pub const fn signature(self) -> &'static str {
        match self {
            Prototype::UnitFromUnit => r#"extern "C" fn()"#,
            Prototype::UnitFromUnitLegacy => r#"extern "C" fn() [unprototyped]"#,
            Prototype::UnitFromInt => r#"extern "C" fn(c_int)"#,
            Prototype::UnitFromSelector => r#"extern "C" fn(Selector)"#,
            Prototype::UnitFromFloat => r#"extern "C" fn(f32)"#,
            Prototype::UnitFromPair => r#"extern "C" fn(Pair)"#,
            Prototype::UnitFromRawPtr => r#"extern "C" fn(*mut c_void)"#,
            Prototype::UnitFromPairPtr => r#"extern "C" fn(*mut Pair)"#,
            Prototype::UnitFromOverlay => r#"extern "C" fn(Overlay)"#,
            Prototype::UnitVariadic => r#"unsafe extern "C" fn(c_int, ...)"#,
            Prototype::IntFromUnit => r#"extern "C" fn() -> c_int"#,
            Prototype::IntFromInt => r#"extern "C" fn(c_int) -> c_int"#,
            Prototype::FloatFromUnit => r#"extern "C" fn() -> f32"#,
            Prototype::FloatFromInt => r#"extern "C" fn(c_int) -> f32"#,
            Prototype::PtrFromUnit => r#"extern "C" fn() -> *mut c_int"#,
            Prototype::PtrFromInt => r#"extern "C" fn(c_int) -> *mut c_int"#,
            Prototype::RawEntry => r#"extern "C" fn() [raw entry +0x30]"#,
        }
    }

    /// Exported symbol name of the target bound to this prototype.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Prototype::UnitFromUnit => "unit_from_unit",
            Prototype::UnitFromUnitLegacy => "unit_from_unit_legacy",
            Prototype::UnitFromInt => "unit_from_int",
            Prototype::UnitFromSelector => "unit_from_selector",
            Prototype::UnitFromFloat => "unit_from_float",
            Prototype::UnitFromPair => "unit_from_pair",
            Prototype::UnitFromRawPtr => "unit_from_raw_ptr",
            Prototype::UnitFromPairPtr => "unit_from_pair_ptr",
            Prototype::UnitFromOverlay => "unit_from_overlay",
            Prototype::UnitVariadic => "unit_counted",
            Prototype::IntFromUnit => "int_from_unit",
            Prototype::IntFromInt => "int_from_int",
            Prototype::FloatFromUnit => "float_from_unit",
            Prototype::FloatFromInt => "float_from_int",
            Prototype::PtrFromUnit => "ptr_from_unit",
            Prototype::PtrFromInt => "ptr_from_int",
            Prototype::RawEntry => "nop_sled",
        }
    }

    /// True for the raw-entry prototype.
    #[must_use]
    pub const fn is_raw_entry(self) -> bool {
        matches!(self, Prototype::RawEntry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn index_round_trips() {
        for (i, proto) in Prototype::ALL.iter().enumerate() {
            assert_eq!(proto.index(), i);
            assert_eq!(Prototype::from_index(i), Some(*proto));
        }
        assert_eq!(Prototype::from_index(PROTOTYPE_COUNT), None);
    }

    #[test]
    fn raw_entry_is_last() {
        assert_eq!(Prototype::RawEntry.index(), RAW_ENTRY_INDEX);
        assert!(Prototype::RawEntry.is_raw_entry());
        assert!(!Prototype::UnitFromUnit.is_raw_entry());
    }

    #[test]
    fn signatures_and_symbols_are_unique() {
        let signatures: HashSet<_> = Prototype::ALL.iter().map(|p| p.signature()).collect();
        assert_eq!(signatures.len(), PROTOTYPE_COUNT);
        let symbols: HashSet<_> = Prototype::ALL.iter().map(|p| p.symbol()).collect();
        assert_eq!(symbols.len(), PROTOTYPE_COUNT);
    }
}
