//! Run configuration.
//!
//! Command-line values take precedence over the standard AWS environment
//! variables (`AWS_PROFILE`, `AWS_REGION`, `AWS_ENDPOINT_URL`).

use crate::store::s3::S3Options;
use crate::utils::parallel::DEFAULT_CONCURRENCY;
use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Which backend serves the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StoreKind {
    /// Amazon S3 bucket
    #[default]
    S3,
    /// Local directory tree
    Local,
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// "Actions performed by ..." blocks
    #[default]
    Text,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => bail!("Invalid format '{}'. Use 'text', 'json' or 'csv'", other),
        }
    }
}

impl OutputFormat {
    /// Pick the format from an explicit flag, else from the output file
    /// extension, else plain text.
    pub fn resolve(explicit: Option<Self>, output: Option<&std::path::Path>) -> Self {
        explicit
            .or_else(|| {
                output
                    .and_then(|p| p.extension())
                    .and_then(|ext| ext.to_str())
                    .and_then(|ext| ext.parse().ok())
            })
            .unwrap_or_default()
    }
}

/// Everything `analyze` needs for one run.
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub store: StoreKind,
    /// Bucket name, or root directory for the local store
    pub namespace: String,
    pub prefix: String,
    pub s3: S3Options,
    pub threads: usize,
    pub filter_name: Option<String>,
    pub max_failures: Option<usize>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub show_failures: bool,
    pub quiet: bool,
}

impl AnalyzeConfig {
    /// Minimal config with defaults for everything but the location.
    pub fn new(store: StoreKind, namespace: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            prefix: prefix.into(),
            s3: S3Options::default(),
            threads: DEFAULT_CONCURRENCY,
            filter_name: None,
            max_failures: None,
            format: OutputFormat::Text,
            output: None,
            show_failures: false,
            quiet: false,
        }
    }

    /// Fill S3 settings left unset on the command line from the environment.
    #[must_use]
    pub fn with_env_fallbacks(mut self) -> Self {
        fn non_empty(var: &str) -> Option<String> {
            env::var(var).ok().filter(|v| !v.trim().is_empty())
        }

        self.s3.profile = self.s3.profile.or_else(|| non_empty("AWS_PROFILE"));
        self.s3.region = self
            .s3
            .region
            .or_else(|| non_empty("AWS_REGION"))
            .or_else(|| non_empty("AWS_DEFAULT_REGION"));
        self.s3.endpoint_url = self.s3.endpoint_url.or_else(|| non_empty("AWS_ENDPOINT_URL"));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            bail!("Bucket name must not be empty");
        }
        if self.threads == 0 {
            bail!("--threads must be at least 1");
        }
        Ok(())
    }
}
