//! Utility functions and helpers.
//!
//! - [`parallel`] - the bounded worker pool that drives a run
//! - [`progress`] - Progress tracking and display utilities
//! - [`reader`] - decompression of fetched objects
//! - [`format`] - number formatting for summaries

pub mod format;
pub mod parallel;
pub mod progress;
pub mod reader;
