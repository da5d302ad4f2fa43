//! Derive macros for Qalib components.
//!
//! Re-exported by the `qalib` facade; depend on `qalib` rather than on
//! this crate directly, since the generated code refers to `::qalib`.

pub use qalib_macros::Component;
