//! Fixed catalog of distinctly-typed indirect-call targets.
//!
//! The catalog binds one concrete `extern "C"` target to each
//! [`prototype::Prototype`] and exposes the same set of targets through two
//! independent dispatch surfaces: a `#[repr(C)]` aggregate of one-element
//! fn-pointer arrays and a bank of standalone scalar fn-pointer globals.
//! A parallel address table records each target's raw entry address for
//! displacement arithmetic.
//!
//! Everything here is built once by [`init`] and is read-only afterward.
//! The crate performs no corruption itself; displaced reads and in-place
//! pointer patches live in `cfieval-inject`.

pub mod prototype;
pub mod surfaces;
pub mod targets;
pub mod values;

pub use prototype::{Prototype, PROTOTYPE_COUNT, RAW_ENTRY_INDEX};
pub use surfaces::{address_of, entry, init, CatalogEntry, RAW_ENTRY_SKEW};
