//! Command implementations.
//!
//! - [`analyze`] - list, process and report the actions performed per identity
//!
//! Shell completion generation lives directly in the binary.

pub mod analyze;
