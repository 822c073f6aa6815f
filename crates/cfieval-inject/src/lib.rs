//! The deliberately unsafe boundary of the evaluation engine.
//!
//! Every raw reinterpretation of fn-pointer storage and every displaced
//! indirect call lives in this crate: that undefined behavior is the
//! independent variable of the experiment, not an accident. Callers in
//! `cfieval-harness` stay ordinary safe code and invoke these entry points
//! only inside a freshly forked trial child, so no corruption ever reaches
//! the parent's copy of the dispatch surfaces.

pub mod cycles;
pub mod dispatch;

pub use cycles::cycle_count;
pub use dispatch::{
    dispatch_corrupted_single, dispatch_via_aggregate, dispatch_via_scalar, displacement,
};
