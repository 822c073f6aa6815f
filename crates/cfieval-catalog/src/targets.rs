//! Concrete callable targets, one per prototype, plus probe siblings.
//!
//! Every target is `#[no_mangle]` + `#[inline(never)]` so it keeps a
//! distinct, stable, objdump-visible entry address, and each prints its own
//! name (and scalar payload where present) so a redirected call is
//! observable in trial output.

use core::arch::asm;
use core::ffi::{c_int, c_void};
use core::ptr;

use crate::values::{Overlay, Pair, Selector};

#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_from_unit() {
    println!("unit_from_unit");
}

/// Address-taken sibling of `unit_from_unit` with a byte-identical
/// signature; only used by the same-signature probe.
#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_from_unit_twin() {
    println!("unit_from_unit_twin");
}

/// Same-signature shadow of `unit_from_unit` whose address is never taken
/// anywhere in this workspace. The harness binary keeps it alive through a
/// dead direct call; the non-address-taken probe locates it via the symbol
/// resolver instead of a pointer.
#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_from_unit_hidden() {
    println!("unit_from_unit_hidden");
}

/// The unprototyped declaration form of the reference catalog; same Rust
/// type as `unit_from_unit`, distinct catalog entry.
#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_from_unit_legacy() {
    println!("unit_from_unit_legacy");
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_from_int(arg: c_int) {
    println!("unit_from_int {arg}");
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_from_selector(arg: Selector) {
    println!("unit_from_selector {arg:?}");
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_from_float(arg: f32) {
    println!("unit_from_float {arg}");
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_from_pair(arg: Pair) {
    println!("unit_from_pair {} {}", arg.a, arg.b);
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_from_raw_ptr(arg: *mut c_void) {
    println!("unit_from_raw_ptr {arg:p}");
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_from_pair_ptr(arg: *mut Pair) {
    println!("unit_from_pair_ptr {arg:p}");
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_from_overlay(arg: Overlay) {
    // SAFETY: every catalog call site constructs Overlay through `word`.
    let word = unsafe { arg.word };
    println!("unit_from_overlay {word}");
}

/// Body of the variadic catalog slot. Stable Rust cannot define a C-variadic
/// function, so the slot stores this fixed-arity target under the
/// variadic-typed `unit_counted_variadic` alias below; trailing register
/// arguments are ignored, matching a variadic that never walks its va_list.
#[no_mangle]
#[inline(never)]
pub extern "C" fn unit_counted(count: c_int) {
    println!("unit_counted {count}");
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn int_from_unit() -> c_int {
    println!("int_from_unit");
    0
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn int_from_int(arg: c_int) -> c_int {
    println!("int_from_int {arg}");
    0
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn float_from_unit() -> f32 {
    println!("float_from_unit");
    0.0
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn float_from_int(arg: c_int) -> f32 {
    println!("float_from_int {arg}");
    0.0
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn ptr_from_unit() -> *mut c_int {
    println!("ptr_from_unit");
    ptr::null_mut()
}

#[no_mangle]
#[inline(never)]
pub extern "C" fn ptr_from_int(arg: c_int) -> *mut c_int {
    println!("ptr_from_int {arg}");
    ptr::null_mut()
}

/// Trivial integer-combining benchmark target. The volatile `nop` keeps the
/// body from being folded away or the indirect call devirtualized.
#[no_mangle]
#[inline(never)]
pub extern "C" fn combine_ints(a: c_int, b: c_int) -> c_int {
    // SAFETY: a single nop has no observable effect beyond pinning the body.
    unsafe {
        asm!("nop", options(nomem, nostack, preserves_flags));
    }
    a.wrapping_mul(b)
}

/// Landing body of the NOP sled; reached by falling through the sled.
#[no_mangle]
#[inline(never)]
pub extern "C" fn nop_sled_body() {
    println!("nop_sled");
}

// The raw-entry routine: a sled of NOPs long enough that entering
// RAW_ENTRY_SKEW (0x30) bytes past the label still lands on executable
// padding, then falls through to `nop_sled_body`.
#[cfg(target_arch = "x86_64")]
core::arch::global_asm!(
    ".pushsection .text",
    ".globl nop_sled",
    ".type nop_sled, @function",
    ".p2align 4",
    "nop_sled:",
    ".rept 96",
    "nop",
    ".endr",
    "jmp {body}",
    ".size nop_sled, . - nop_sled",
    ".popsection",
    body = sym nop_sled_body,
);

#[cfg(target_arch = "aarch64")]
core::arch::global_asm!(
    ".pushsection .text",
    ".globl nop_sled",
    ".type nop_sled, %function",
    ".p2align 2",
    "nop_sled:",
    ".rept 24",
    "nop",
    ".endr",
    "b {body}",
    ".size nop_sled, . - nop_sled",
    ".popsection",
    body = sym nop_sled_body,
);

extern "C" {
    /// Entry label of the NOP sled defined above. The catalog records
    /// `nop_sled as usize + RAW_ENTRY_SKEW` as this target's address.
    pub fn nop_sled();

    /// Variadic-typed alias of [`unit_counted`]: same symbol, variadic
    /// call-site type.
    #[link_name = "unit_counted"]
    pub fn unit_counted_variadic(count: c_int, ...);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_have_distinct_addresses() {
        let addrs = [
            unit_from_unit as usize,
            unit_from_unit_legacy as usize,
            unit_from_unit_twin as usize,
            unit_from_int as usize,
            combine_ints as usize,
            nop_sled_body as usize,
            nop_sled as usize,
        ];
        for (i, a) in addrs.iter().enumerate() {
            assert_ne!(*a, 0);
            for b in &addrs[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn variadic_alias_shares_the_fixed_arity_entry() {
        assert_eq!(unit_counted_variadic as usize, unit_counted as usize);
    }

    #[test]
    fn combine_ints_combines() {
        assert_eq!(combine_ints(6, 7), 42);
        assert_eq!(combine_ints(-3, 5), -15);
    }
}
