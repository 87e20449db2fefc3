//! Aggregation of extracted actions.
//!
//! - [`index`] - the concurrent identity → action-set index
//! - [`report`] - the filtered, sorted view used for output

pub mod index;
pub mod report;

pub use index::{AggregationIndex, IndexSnapshot};
pub use report::{filter_report, IdentityActions};
