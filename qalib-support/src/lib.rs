//! # Qalib Support
//!
//! Shared utilities for the Qalib component container.
//!
//! This crate provides:
//! - Text rendering for error messages
//! - Production-mode detection from the environment

pub mod environment;
pub mod rendering;
