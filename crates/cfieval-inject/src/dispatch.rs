//! Displaced dispatch through both surfaces and single-pointer corruption.
//!
//! Each dispatcher preserves the call site's static type while the dynamic
//! target diverges: the aggregate surface walks a signed slot delta across
//! differently-typed fields, the scalar surface patches a global pointer's
//! storage in place, and the single-pointer form patches one local pointer
//! by a raw byte displacement. Argument lists always follow the *declared*
//! prototype.

use core::ffi::{c_int, c_void};
use core::ptr::{addr_of, addr_of_mut, read_volatile};

use cfieval_catalog::prototype::{
    FloatFn, FloatIntFn, IntFn, IntIntFn, Prototype, PtrFn, PtrIntFn, RawEntryFn, UnitFloatFn,
    UnitFn, UnitIntFn, UnitOverlayFn, UnitPairFn, UnitPairPtrFn, UnitRawPtrFn, UnitSelectorFn,
    UnitVariadicFn,
};
use cfieval_catalog::surfaces;
use cfieval_catalog::targets;
use cfieval_catalog::values::{Overlay, Pair, Selector};

/// Signed byte displacement between two catalog entries.
#[must_use]
pub fn displacement(declared: Prototype, actual: Prototype) -> isize {
    let from = surfaces::address_of(declared) as isize;
    let to = surfaces::address_of(actual) as isize;
    to.wrapping_sub(from)
}

// Resolve the aggregate slot `delta` fields away from the one nominally
// selected by the declared prototype, volatile so the displaced read cannot
// be folded back to the in-bounds slot.
macro_rules! displaced_slot {
    ($field:ident, $fnty:ty, $delta:expr) => {
        read_volatile(
            addr_of!(surfaces::AGGREGATE.$field)
                .cast::<$fnty>()
                .offset($delta),
        )
    };
}

// Reinterpret one scalar pointer global as an address-sized cell, add the
// byte displacement in place, then volatile-read the patched pointer back.
macro_rules! corrupted_scalar {
    ($name:ident, $disp:expr) => {{
        let cell = addr_of_mut!(surfaces::$name).cast::<usize>();
        *cell = (*cell).wrapping_add_signed($disp);
        read_volatile(addr_of!(surfaces::$name))
    }};
}

/// Invoke catalog member `actual` through the aggregate slot statically
/// typed for `declared`, with `declared`'s argument list.
///
/// An out-of-range `declared` is a caller programming error: logged and
/// skipped, never fatal. The variadic prototype dispatches twice, once with
/// its minimal contract and once with one extra argument.
///
/// # Safety
///
/// Deliberate undefined behavior when `declared != actual`: the call
/// executes a target under a mismatched static type. Must only run inside
/// an isolated trial child whose memory image is discarded afterwards.
pub unsafe fn dispatch_via_aggregate(declared: usize, actual: usize, payload: c_int) {
    let Some(proto) = Prototype::from_index(declared) else {
        eprintln!("dispatch: declared index {declared} out of range, call skipped");
        return;
    };
    let delta = (actual as isize).wrapping_sub(declared as isize);
    let mut pair = Pair {
        a: 42,
        b: payload,
    };
    let overlay = Overlay { word: 23 };
    // SAFETY: caller contract; the displaced slot read and the mismatched
    // invocation are the experiment itself.
    unsafe {
        match proto {
            Prototype::UnitFromUnit => {
                (displaced_slot!(unit_from_unit, UnitFn, delta))();
            }
            Prototype::UnitFromUnitLegacy => {
                (displaced_slot!(unit_from_unit_legacy, UnitFn, delta))();
            }
            Prototype::UnitFromInt => {
                (displaced_slot!(unit_from_int, UnitIntFn, delta))(declared as c_int);
            }
            Prototype::UnitFromSelector => {
                (displaced_slot!(unit_from_selector, UnitSelectorFn, delta))(Selector::Third);
            }
            Prototype::UnitFromFloat => {
                (displaced_slot!(unit_from_float, UnitFloatFn, delta))(declared as f32);
            }
            Prototype::UnitFromPair => {
                (displaced_slot!(unit_from_pair, UnitPairFn, delta))(pair);
            }
            Prototype::UnitFromRawPtr => {
                (displaced_slot!(unit_from_raw_ptr, UnitRawPtrFn, delta))(
                    addr_of_mut!(pair).cast::<c_void>(),
                );
            }
            Prototype::UnitFromPairPtr => {
                (displaced_slot!(unit_from_pair_ptr, UnitPairPtrFn, delta))(addr_of_mut!(pair));
            }
            Prototype::UnitFromOverlay => {
                (displaced_slot!(unit_from_overlay, UnitOverlayFn, delta))(overlay);
            }
            Prototype::UnitVariadic => {
                let f = displaced_slot!(unit_variadic, UnitVariadicFn, delta);
                f(declared as c_int, actual as c_int);
                f(declared as c_int, actual as c_int, declared as c_int);
            }
            Prototype::IntFromUnit => {
                let _ = (displaced_slot!(int_from_unit, IntFn, delta))();
            }
            Prototype::IntFromInt => {
                let _ = (displaced_slot!(int_from_int, IntIntFn, delta))(declared as c_int);
            }
            Prototype::FloatFromUnit => {
                let _ = (displaced_slot!(float_from_unit, FloatFn, delta))();
            }
            Prototype::FloatFromInt => {
                let _ = (displaced_slot!(float_from_int, FloatIntFn, delta))(declared as c_int);
            }
            Prototype::PtrFromUnit => {
                let _ = (displaced_slot!(ptr_from_unit, PtrFn, delta))();
            }
            Prototype::PtrFromInt => {
                let _ = (displaced_slot!(ptr_from_int, PtrIntFn, delta))(declared as c_int);
            }
            Prototype::RawEntry => {
                (displaced_slot!(raw_entry, RawEntryFn, delta))();
            }
        }
    }
}

/// Invoke catalog member `actual` through the scalar pointer global
/// statically typed for `declared`, after patching that global's storage by
/// the byte displacement between the two entries.
///
/// # Safety
///
/// Same contract as [`dispatch_via_aggregate`]; additionally mutates the
/// scalar pointer bank, so it must never run in the parent image.
pub unsafe fn dispatch_via_scalar(declared: usize, actual: usize, payload: c_int) {
    let Some(proto) = Prototype::from_index(declared) else {
        eprintln!("dispatch: declared index {declared} out of range, call skipped");
        return;
    };
    let Some(actual_proto) = Prototype::from_index(actual) else {
        eprintln!("dispatch: actual index {actual} out of range, call skipped");
        return;
    };
    let disp = displacement(proto, actual_proto);
    let mut pair = Pair {
        a: 42,
        b: payload,
    };
    let overlay = Overlay { word: 23 };
    // SAFETY: caller contract; the in-place pointer patch and the
    // mismatched invocation are the experiment itself.
    unsafe {
        match proto {
            Prototype::UnitFromUnit => {
                (corrupted_scalar!(SCALAR_UNIT_FROM_UNIT, disp))();
            }
            Prototype::UnitFromUnitLegacy => {
                (corrupted_scalar!(SCALAR_UNIT_FROM_UNIT_LEGACY, disp))();
            }
            Prototype::UnitFromInt => {
                (corrupted_scalar!(SCALAR_UNIT_FROM_INT, disp))(declared as c_int);
            }
            Prototype::UnitFromSelector => {
                (corrupted_scalar!(SCALAR_UNIT_FROM_SELECTOR, disp))(Selector::Third);
            }
            Prototype::UnitFromFloat => {
                (corrupted_scalar!(SCALAR_UNIT_FROM_FLOAT, disp))(declared as f32);
            }
            Prototype::UnitFromPair => {
                (corrupted_scalar!(SCALAR_UNIT_FROM_PAIR, disp))(pair);
            }
            Prototype::UnitFromRawPtr => {
                (corrupted_scalar!(SCALAR_UNIT_FROM_RAW_PTR, disp))(
                    addr_of_mut!(pair).cast::<c_void>(),
                );
            }
            Prototype::UnitFromPairPtr => {
                (corrupted_scalar!(SCALAR_UNIT_FROM_PAIR_PTR, disp))(addr_of_mut!(pair));
            }
            Prototype::UnitFromOverlay => {
                (corrupted_scalar!(SCALAR_UNIT_FROM_OVERLAY, disp))(overlay);
            }
            Prototype::UnitVariadic => {
                let f = corrupted_scalar!(SCALAR_UNIT_VARIADIC, disp);
                f(declared as c_int, actual as c_int);
                f(declared as c_int, actual as c_int, declared as c_int);
            }
            Prototype::IntFromUnit => {
                let _ = (corrupted_scalar!(SCALAR_INT_FROM_UNIT, disp))();
            }
            Prototype::IntFromInt => {
                let _ = (corrupted_scalar!(SCALAR_INT_FROM_INT, disp))(declared as c_int);
            }
            Prototype::FloatFromUnit => {
                let _ = (corrupted_scalar!(SCALAR_FLOAT_FROM_UNIT, disp))();
            }
            Prototype::FloatFromInt => {
                let _ = (corrupted_scalar!(SCALAR_FLOAT_FROM_INT, disp))(declared as c_int);
            }
            Prototype::PtrFromUnit => {
                let _ = (corrupted_scalar!(SCALAR_PTR_FROM_UNIT, disp))();
            }
            Prototype::PtrFromInt => {
                let _ = (corrupted_scalar!(SCALAR_PTR_FROM_INT, disp))(declared as c_int);
            }
            Prototype::RawEntry => {
                (corrupted_scalar!(SCALAR_RAW_ENTRY, disp))();
            }
        }
    }
}

/// Patch one known-good local `extern "C" fn()` pointer by a raw byte
/// displacement and call through it. Used by the same-signature and
/// non-address-taken probes, where the redirect stays within one signature
/// equivalence class.
///
/// # Safety
///
/// `byte_displacement` must move the pointer to the entry of a routine that
/// is ABI-compatible with `extern "C" fn()`, or the call is free to fault;
/// both outcomes are valid trial results. Isolation contract as above.
pub unsafe fn dispatch_corrupted_single(byte_displacement: isize) {
    let mut target: UnitFn = targets::unit_from_unit;
    let cell = addr_of_mut!(target).cast::<usize>();
    // SAFETY: caller contract; the patched pointer is volatile-read so the
    // call cannot be devirtualized back to the original target.
    unsafe {
        *cell = (*cell).wrapping_add_signed(byte_displacement);
        let f = read_volatile(addr_of!(target));
        f();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfieval_catalog::prototype::PROTOTYPE_COUNT;
    use cfieval_catalog::surfaces::RAW_ENTRY_SKEW;

    #[test]
    fn displacement_is_zero_on_the_diagonal() {
        cfieval_catalog::init();
        for proto in Prototype::ALL {
            assert_eq!(displacement(proto, proto), 0);
        }
    }

    #[test]
    fn displacement_is_antisymmetric() {
        cfieval_catalog::init();
        for a in Prototype::ALL {
            for b in Prototype::ALL {
                assert_eq!(displacement(a, b), -displacement(b, a));
            }
        }
    }

    #[test]
    fn displacement_reaches_the_skewed_raw_entry() {
        cfieval_catalog::init();
        let expected = (targets::nop_sled as usize + RAW_ENTRY_SKEW) as isize
            - targets::unit_from_unit as usize as isize;
        assert_eq!(
            displacement(Prototype::UnitFromUnit, Prototype::RawEntry),
            expected
        );
    }

    #[test]
    fn diagonal_aggregate_dispatch_is_well_typed() {
        cfieval_catalog::init();
        // declared == actual is an ordinary valid call for every prototype
        // but the raw entry.
        for index in 0..PROTOTYPE_COUNT - 1 {
            // SAFETY: zero delta resolves the nominal in-bounds slot.
            unsafe { dispatch_via_aggregate(index, index, 23) };
        }
    }

    #[test]
    fn raw_entry_sled_falls_through_to_its_body() {
        cfieval_catalog::init();
        let skewed = targets::nop_sled as usize + RAW_ENTRY_SKEW;
        // SAFETY: the sled is long enough that entry + RAW_ENTRY_SKEW still
        // lands on padding that falls through to nop_sled_body.
        unsafe {
            let f = core::mem::transmute::<usize, RawEntryFn>(skewed);
            f();
        }
    }

    #[test]
    fn out_of_range_declared_is_skipped() {
        cfieval_catalog::init();
        // SAFETY: the guard returns before any slot is resolved.
        unsafe {
            dispatch_via_aggregate(PROTOTYPE_COUNT, 0, 23);
            dispatch_via_scalar(PROTOTYPE_COUNT, 0, 23);
            dispatch_via_scalar(0, PROTOTYPE_COUNT, 23);
        }
    }
}
