use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use cloudtrail_actions::commands;
use cloudtrail_actions::config::{AnalyzeConfig, OutputFormat, StoreKind};
use cloudtrail_actions::store::s3::S3Options;
use cloudtrail_actions::utils::parallel::DEFAULT_CONCURRENCY;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cloudtrail-actions")]
#[command(about = "Inventory the AWS actions each IAM identity performed, from CloudTrail logs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze CloudTrail logs for the actions performed by each identity
    Analyze {
        /// The S3 bucket name containing CloudTrail logs (directory with --store local)
        #[arg(long, alias = "bucket-name")]
        bucket: String,

        /// The S3 prefix for CloudTrail logs
        #[arg(long, default_value = "")]
        prefix: String,

        /// AWS profile to use for accessing the bucket (default: $AWS_PROFILE)
        #[arg(long)]
        profile: Option<String>,

        /// AWS region (default: $AWS_REGION or the profile's region)
        #[arg(long)]
        region: Option<String>,

        /// Custom S3 endpoint URL for S3-compatible stores (default: $AWS_ENDPOINT_URL)
        #[arg(long)]
        endpoint_url: Option<String>,

        /// Where the logs live
        #[arg(long, value_enum, default_value_t = StoreKind::S3)]
        store: StoreKind,

        /// Number of worker threads processing log files
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        threads: usize,

        /// Only report identities whose ARN contains this string
        #[arg(long)]
        filter_name: Option<String>,

        /// Abort once more than this many log files fail (default: never abort)
        #[arg(long)]
        max_failures: Option<usize>,

        /// Output format (auto-detected from --output extension if not specified)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// List every failed log file in the summary
        #[arg(long)]
        show_failures: bool,

        /// Suppress progress bars and the summary (failures are still reported)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Generate shell completion scripts
    GenerateCompletion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            bucket,
            prefix,
            profile,
            region,
            endpoint_url,
            store,
            threads,
            filter_name,
            max_failures,
            format,
            output,
            show_failures,
            quiet,
        } => {
            let mut config = AnalyzeConfig::new(store, bucket, prefix);
            config.s3 = S3Options {
                profile,
                region,
                endpoint_url,
            };
            config.threads = threads;
            config.filter_name = filter_name.filter(|f| !f.is_empty());
            config.max_failures = max_failures;
            config.format = OutputFormat::resolve(format, output.as_deref());
            config.output = output;
            config.show_failures = show_failures;
            config.quiet = quiet;

            commands::analyze::run(&config.with_env_fallbacks())
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "cloudtrail-actions", &mut std::io::stdout());
            Ok(())
        }
    }
}
