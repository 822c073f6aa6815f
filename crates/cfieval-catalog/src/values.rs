//! Argument carrier types shared by the catalog targets.
//!
//! Each type exists to give one prototype class a distinct argument ABI:
//! a by-value struct, a C-layout enum, and a C-layout union.

use core::ffi::c_int;

/// Two-field struct passed by value to exercise aggregate argument passing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub a: c_int,
    pub b: c_int,
}

/// C-layout enum argument class.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    First,
    Second,
    Third,
}

/// C-layout union argument class overlapping a pointer, an enum, and an int.
#[repr(C)]
#[derive(Clone, Copy)]
pub union Overlay {
    pub pair: *mut Pair,
    pub selector: Selector,
    pub word: c_int,
}
