//! Hardware cycle counter reads for the throughput probe.
//!
//! `rdtsc` on x86_64, the virtual counter on aarch64. Both are monotonic
//! for the duration of a measurement; frequency differences between the two
//! do not matter because overhead is derived by differencing two runs on
//! the same machine.

use core::arch::asm;

/// Read the hardware cycle counter.
#[inline]
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn cycle_count() -> u64 {
    let lo: u64;
    let hi: u64;
    // SAFETY: rdtsc reads the timestamp counter and zero-extends into
    // rax/rdx; no memory or flags are touched.
    unsafe {
        asm!(
            "rdtsc",
            out("rax") lo,
            out("rdx") hi,
            options(nomem, nostack, preserves_flags),
        );
    }
    (hi << 32) | lo
}

/// Read the hardware cycle counter.
#[inline]
#[cfg(target_arch = "aarch64")]
#[must_use]
pub fn cycle_count() -> u64 {
    let ticks: u64;
    // SAFETY: cntvct_el0 is readable from EL0 and has no side effects.
    unsafe {
        asm!(
            "mrs {t}, cntvct_el0",
            t = out(reg) ticks,
            options(nomem, nostack, preserves_flags),
        );
    }
    ticks
}
