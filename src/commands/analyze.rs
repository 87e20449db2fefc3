//! Per-identity action inventory from CloudTrail logs.
//!
//! Lists every object under a bucket prefix, processes the CloudTrail log files
//! in parallel, and prints which distinct actions each IAM identity performed.
//! Sessions of an assumed role are reported under the role itself.
//!
//! # Usage
//!
//! ```bash
//! # Everything under a trail prefix
//! cloudtrail-actions analyze --bucket my-trail-bucket \
//!     --prefix AWSLogs/111122223333/CloudTrail/ --profile audit
//!
//! # Only identities whose ARN contains "Deploy", 32 workers
//! cloudtrail-actions analyze --bucket my-trail-bucket --prefix AWSLogs/ \
//!     --filter-name Deploy --threads 32
//!
//! # Logs already synced to disk, exported as CSV
//! cloudtrail-actions analyze --store local --bucket ./trail --output actions.csv
//! ```
//!
//! # Output
//!
//! For each identity, a header line followed by its sorted actions:
//!
//! ```text
//! Actions performed by arn:aws:iam::111122223333:role/Deploy
//! - ec2 - DescribeInstances
//! - s3 - PutObject
//! ```
//!
//! A processing summary (including failed objects) goes to stderr.

use crate::analysis::{filter_report, IdentityActions};
use crate::config::{AnalyzeConfig, OutputFormat, StoreKind};
use crate::error::PipelineError;
use crate::store::local::LocalStore;
use crate::store::s3::S3Store;
use crate::store::{list_objects, ObjectStore};
use crate::utils::format::format_number;
use crate::utils::parallel::{Pipeline, RunReport};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::info;

/// One CSV row.
#[derive(Debug, Serialize)]
struct ActionRow<'a> {
    identity: &'a str,
    action: &'a str,
}

/// List, process and filter. Returns the report rows and the run statistics.
///
/// Only a listing failure, or exceeding `max_failures`, is an error; objects
/// that fail individually are reported in [`RunReport::failures`].
pub fn analyze<S: ObjectStore>(
    store: S,
    config: &AnalyzeConfig,
) -> Result<(Vec<IdentityActions>, RunReport)> {
    config.validate()?;

    let objects = list_objects(&store, &config.namespace, &config.prefix, config.quiet)
        .context("Failed to list CloudTrail logs")?;
    info!(objects = objects.len(), prefix = %config.prefix, "listing finished");

    let pipeline = Pipeline::new(store, config.namespace.clone())
        .concurrency(config.threads)
        .tolerance(config.max_failures)
        .quiet(config.quiet);

    let report = match pipeline.run(&objects) {
        Ok(report) => report,
        Err(PipelineError::ToleranceExceeded {
            failed,
            tolerance,
            report,
        }) => {
            report.print_summary(config.show_failures);
            anyhow::bail!(
                "Aborted: {} objects failed, more than the allowed {}",
                format_number(failed),
                format_number(tolerance)
            );
        }
        Err(e) => return Err(e).context("Failed to run processing pipeline"),
    };

    let rows = filter_report(&report.snapshot, config.filter_name.as_deref());
    Ok((rows, report))
}

/// Write the report rows in the requested format.
pub fn render<W: Write>(rows: &[IdentityActions], format: OutputFormat, mut out: W) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for row in rows {
                writeln!(out, "Actions performed by {}", row.identity)?;
                for action in &row.actions {
                    writeln!(out, "- {}", action)?;
                }
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, rows).context("Failed to write JSON output")?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut out);
            for row in rows {
                for action in &row.actions {
                    writer
                        .serialize(ActionRow {
                            identity: &row.identity,
                            action,
                        })
                        .context("Failed to write CSV record")?;
                }
            }
            writer.flush().context("Failed to flush CSV writer")?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Entry point for `cloudtrail-actions analyze`.
pub fn run(config: &AnalyzeConfig) -> Result<()> {
    config.validate()?;

    let store: Box<dyn ObjectStore> = match config.store {
        StoreKind::S3 => Box::new(
            S3Store::connect(&config.s3).context("Failed to create S3 client")?,
        ),
        StoreKind::Local => Box::new(LocalStore::new()),
    };

    let (rows, report) = analyze(store, config)?;

    if !config.quiet || !report.failures.is_empty() {
        report.print_summary(config.show_failures);
    }

    match &config.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            render(&rows, config.format, BufWriter::new(file))?;
            eprintln!(
                "Wrote {} identities to {}",
                format_number(rows.len()),
                path.display()
            );
        }
        None => render(&rows, config.format, io::stdout().lock())?,
    }

    Ok(())
}
