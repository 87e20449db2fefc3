//! # CloudTrail Actions
//!
//! Build an inventory of the distinct AWS actions each IAM identity performed,
//! straight from the CloudTrail logs a trail delivers to S3.
//!
//! ## Overview
//!
//! A trail writes one gzip-compressed JSON document per delivery, and a busy
//! account accumulates hundreds of thousands of them. This crate lists every
//! log object under a prefix, fetches and parses them on a bounded pool of
//! worker threads, and folds each record's caller and API call into a
//! per-identity set of actions. The result is the input for least-privilege
//! work: what did this role actually use?
//!
//! ## Features
//!
//! - **Parallel Processing** - configurable number of workers fetching and
//!   parsing log files concurrently
//! - **Role folding** - STS assumed-role sessions are attributed to the IAM role
//! - **Fail-soft** - a missing or corrupt log file is recorded and skipped, the
//!   rest of the run continues (optionally bounded by `--max-failures`)
//! - **Digest filtering** - CloudTrail digest files and non-log objects are
//!   never downloaded
//! - **Text, JSON and CSV output**
//! - **S3 or local directory** sources
//!
//! ## Architecture
//!
//! - [`audit`] - CloudTrail document types, record extraction, identity normalization
//! - [`analysis`] - the concurrent aggregation index and the report filter
//! - [`store`] - object store abstraction with S3 and local-directory backends
//! - [`utils`] - the parallel pipeline, decompression, progress, formatting
//! - [`commands`] - the `analyze` command
//! - [`config`] - run configuration and environment fallbacks
//! - [`error`] - error types
//!
//! ## Example Usage
//!
//! ```bash
//! cloudtrail-actions analyze --bucket my-trail-bucket \
//!     --prefix AWSLogs/111122223333/CloudTrail/ --profile audit --threads 20
//!
//! # Only roles named like "Deploy"
//! cloudtrail-actions analyze --bucket my-trail-bucket --prefix AWSLogs/ --filter-name Deploy
//! ```

pub mod analysis;
pub mod audit;
pub mod commands;
pub mod config;
pub mod error;
pub mod store;
pub mod utils;
