//! CloudTrail log parsing.
//!
//! - [`types`] - serde models for CloudTrail documents and records
//! - [`parser`] - lazy extraction of `(caller, action)` pairs from a document
//! - [`identity`] - folding of STS session ARNs onto their IAM role

pub mod identity;
pub mod parser;
pub mod types;
