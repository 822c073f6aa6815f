//! Dispatch surfaces and the address table.
//!
//! Two independent call-site shapes expose the catalog:
//! - [`AGGREGATE`]: a `#[repr(C)]` struct of one-element fn-pointer arrays,
//!   one field per prototype in catalog index order, so a signed slot delta
//!   walks across fields of different static types;
//! - the `SCALAR_*` bank: standalone global fn-pointer variables whose
//!   storage can be patched in place.
//!
//! [`ADDRESSES`] records each target's raw entry address at the same index.
//! All three are written exactly once by [`init`] (which also applies the
//! raw-entry skew) and are read-only for the rest of the process lifetime;
//! trial children mutate only their private copy-on-write images.

use core::ptr::addr_of_mut;
use std::sync::Once;

use crate::prototype::{
    FloatFn, FloatIntFn, IntFn, IntIntFn, Prototype, PtrFn, PtrIntFn, RawEntryFn, UnitFloatFn,
    UnitFn, UnitIntFn, UnitOverlayFn, UnitPairFn, UnitPairPtrFn, UnitRawPtrFn, UnitSelectorFn,
    UnitVariadicFn, PROTOTYPE_COUNT,
};
use crate::targets;

/// Byte offset into the NOP sled at which the raw-entry target begins.
pub const RAW_ENTRY_SKEW: usize = 0x30;

/// Aggregate-of-arrays dispatch surface. Field order must match
/// [`Prototype::ALL`]; every field is one pointer-sized slot.
#[repr(C)]
pub struct AggregateBank {
    pub unit_from_unit: [UnitFn; 1],
    pub unit_from_unit_legacy: [UnitFn; 1],
    pub unit_from_int: [UnitIntFn; 1],
    pub unit_from_selector: [UnitSelectorFn; 1],
    pub unit_from_float: [UnitFloatFn; 1],
    pub unit_from_pair: [UnitPairFn; 1],
    pub unit_from_raw_ptr: [UnitRawPtrFn; 1],
    pub unit_from_pair_ptr: [UnitPairPtrFn; 1],
    pub unit_from_overlay: [UnitOverlayFn; 1],
    pub unit_variadic: [UnitVariadicFn; 1],
    pub int_from_unit: [IntFn; 1],
    pub int_from_int: [IntIntFn; 1],
    pub float_from_unit: [FloatFn; 1],
    pub float_from_int: [FloatIntFn; 1],
    pub ptr_from_unit: [PtrFn; 1],
    pub ptr_from_int: [PtrIntFn; 1],
    pub raw_entry: [RawEntryFn; 1],
}

pub static mut AGGREGATE: AggregateBank = AggregateBank {
    unit_from_unit: [targets::unit_from_unit],
    unit_from_unit_legacy: [targets::unit_from_unit_legacy],
    unit_from_int: [targets::unit_from_int],
    unit_from_selector: [targets::unit_from_selector],
    unit_from_float: [targets::unit_from_float],
    unit_from_pair: [targets::unit_from_pair],
    unit_from_raw_ptr: [targets::unit_from_raw_ptr],
    unit_from_pair_ptr: [targets::unit_from_pair_ptr],
    unit_from_overlay: [targets::unit_from_overlay],
    unit_variadic: [targets::unit_counted_variadic],
    int_from_unit: [targets::int_from_unit],
    int_from_int: [targets::int_from_int],
    float_from_unit: [targets::float_from_unit],
    float_from_int: [targets::float_from_int],
    ptr_from_unit: [targets::ptr_from_unit],
    ptr_from_int: [targets::ptr_from_int],
    raw_entry: [targets::nop_sled],
};

// Scalar-pointer dispatch surface, one global per prototype.
pub static mut SCALAR_UNIT_FROM_UNIT: UnitFn = targets::unit_from_unit;
pub static mut SCALAR_UNIT_FROM_UNIT_LEGACY: UnitFn = targets::unit_from_unit_legacy;
pub static mut SCALAR_UNIT_FROM_INT: UnitIntFn = targets::unit_from_int;
pub static mut SCALAR_UNIT_FROM_SELECTOR: UnitSelectorFn = targets::unit_from_selector;
pub static mut SCALAR_UNIT_FROM_FLOAT: UnitFloatFn = targets::unit_from_float;
pub static mut SCALAR_UNIT_FROM_PAIR: UnitPairFn = targets::unit_from_pair;
pub static mut SCALAR_UNIT_FROM_RAW_PTR: UnitRawPtrFn = targets::unit_from_raw_ptr;
pub static mut SCALAR_UNIT_FROM_PAIR_PTR: UnitPairPtrFn = targets::unit_from_pair_ptr;
pub static mut SCALAR_UNIT_FROM_OVERLAY: UnitOverlayFn = targets::unit_from_overlay;
pub static mut SCALAR_UNIT_VARIADIC: UnitVariadicFn = targets::unit_counted_variadic;
pub static mut SCALAR_INT_FROM_UNIT: IntFn = targets::int_from_unit;
pub static mut SCALAR_INT_FROM_INT: IntIntFn = targets::int_from_int;
pub static mut SCALAR_FLOAT_FROM_UNIT: FloatFn = targets::float_from_unit;
pub static mut SCALAR_FLOAT_FROM_INT: FloatIntFn = targets::float_from_int;
pub static mut SCALAR_PTR_FROM_UNIT: PtrFn = targets::ptr_from_unit;
pub static mut SCALAR_PTR_FROM_INT: PtrIntFn = targets::ptr_from_int;
pub static mut SCALAR_RAW_ENTRY: RawEntryFn = targets::nop_sled;

/// Raw entry address of each target, indexed by prototype. Filled by
/// [`init`]; index [`crate::RAW_ENTRY_INDEX`] already includes the skew.
pub static mut ADDRESSES: [usize; PROTOTYPE_COUNT] = [0; PROTOTYPE_COUNT];

static INIT: Once = Once::new();

/// One concrete target bound to a prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub prototype: Prototype,
    pub symbol: &'static str,
    pub address: usize,
}

/// Build the address table and apply the raw-entry skew to both surfaces.
///
/// Idempotent; must run before any dispatch, displacement computation, or
/// sweep. Everything it writes is treated as immutable afterward.
pub fn init() {
    INIT.call_once(|| {
        let table: [usize; PROTOTYPE_COUNT] = [
            targets::unit_from_unit as usize,
            targets::unit_from_unit_legacy as usize,
            targets::unit_from_int as usize,
            targets::unit_from_selector as usize,
            targets::unit_from_float as usize,
            targets::unit_from_pair as usize,
            targets::unit_from_raw_ptr as usize,
            targets::unit_from_pair_ptr as usize,
            targets::unit_from_overlay as usize,
            targets::unit_counted as usize,
            targets::int_from_unit as usize,
            targets::int_from_int as usize,
            targets::float_from_unit as usize,
            targets::float_from_int as usize,
            targets::ptr_from_unit as usize,
            targets::ptr_from_int as usize,
            targets::nop_sled as usize + RAW_ENTRY_SKEW,
        ];
        // SAFETY: Once guarantees a single writer; nothing reads these
        // statics before init() returns. The raw-entry slots are patched
        // through pointer-sized cells, never dereferenced here.
        unsafe {
            *addr_of_mut!(ADDRESSES) = table;
            let aggregate_cell = addr_of_mut!(AGGREGATE.raw_entry).cast::<usize>();
            *aggregate_cell = (*aggregate_cell).wrapping_add(RAW_ENTRY_SKEW);
            let scalar_cell = addr_of_mut!(SCALAR_RAW_ENTRY).cast::<usize>();
            *scalar_cell = (*scalar_cell).wrapping_add(RAW_ENTRY_SKEW);
        }
    });
}

/// Recorded entry address of the target bound to `proto`.
#[must_use]
pub fn address_of(proto: Prototype) -> usize {
    // SAFETY: ADDRESSES is written once under INIT and read-only afterward.
    let address = unsafe { ADDRESSES[proto.index()] };
    debug_assert!(address != 0, "catalog::init() must run before address_of");
    address
}

/// Catalog entry for `proto`.
#[must_use]
pub fn entry(proto: Prototype) -> CatalogEntry {
    CatalogEntry {
        prototype: proto,
        symbol: proto.symbol(),
        address: address_of(proto),
    }
}
