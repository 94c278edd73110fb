use anyhow::Result;
use clap::{Parser, Subcommand};
use pipeline::augment::{augment_dataset, AugmentOptions};
use pipeline::config::RedtraceConfig;
use pipeline::filter::{filter_dataset, FilterOptions};
use pipeline::prepare::prepare_dataset;
use pipeline::report::{analyze_dataset, analyze_log_dir, render_funnel, render_report};
use pipeline::tokens::write_tokenizer_config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "redtrace",
    about = "Redtrace dataset tools: prepare, filter, augment, validate, diagnose"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the training dataset from raw agent session logs.
    Prepare {
        /// Directory of raw .jsonl log files.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output dataset file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Drop examples without a real tool-use workflow.
    Filter {
        /// Input dataset file.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output dataset file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum count of assistant tool-call messages.
        #[arg(long)]
        min_tool_calls: Option<usize>,

        /// Minimum character length of the final assistant response.
        #[arg(long)]
        min_response_length: Option<usize>,
    },

    /// Generate payload-substituted variants per vulnerability class.
    Augment {
        /// Input dataset file.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output dataset file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fraction of each vulnerability bucket to clone.
        #[arg(long)]
        factor: Option<f64>,

        /// Fixed seed for reproducible output.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Validate a dataset file and print an aggregate report.
    Validate {
        /// Dataset file to validate.
        file: PathBuf,
    },

    /// Trace where raw log records drop out of the preparation pipeline.
    Diagnose {
        /// Directory of raw .jsonl log files.
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Write the security token vocabulary for the tokenizer.
    Tokens {
        /// Tokenizer output directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = RedtraceConfig::from_env();

    match cli.command {
        Commands::Prepare { input, output } => {
            let input = input.unwrap_or(config.raw_logs_dir);
            let output = output.unwrap_or(config.training_file);
            let stats = prepare_dataset(&input, &output)?;
            println!(
                "Dataset prepared: {} (files={} records={} parse_errors={})",
                output.display(),
                stats.files,
                stats.records,
                stats.parse_errors,
            );
            println!(
                "Examples: total={} seed={} conversation={} individual={}",
                stats.total_examples(),
                stats.seed_examples,
                stats.conversation_examples,
                stats.record_examples,
            );
            Ok(())
        }
        Commands::Filter {
            input,
            output,
            min_tool_calls,
            min_response_length,
        } => {
            let input = input.unwrap_or(config.training_file);
            let output = output.unwrap_or(config.filtered_file);
            let opts = FilterOptions {
                min_tool_calls: min_tool_calls.unwrap_or(config.min_tool_calls),
                min_response_length: min_response_length.unwrap_or(config.min_response_length),
            };
            let stats = filter_dataset(&input, &output, &opts)?;
            println!(
                "Filtered {} -> {}: kept={} dropped={} skipped={}",
                input.display(),
                output.display(),
                stats.kept,
                stats.dropped,
                stats.skipped,
            );
            Ok(())
        }
        Commands::Augment {
            input,
            output,
            factor,
            seed,
        } => {
            let input = input.unwrap_or(config.filtered_file);
            let output = output.unwrap_or(config.augmented_file);
            let opts = AugmentOptions {
                factor: factor.unwrap_or(config.augmentation_factor),
            };
            let seed = seed.or(config.augment_seed);
            let stats = augment_dataset(&input, &output, &opts, seed)?;
            println!(
                "Augmented {} -> {}: original={} generated={} skipped={}",
                input.display(),
                output.display(),
                stats.original,
                stats.generated,
                stats.skipped,
            );
            println!(
                "Buckets: idor={} default_creds={} ssrf={} xss={} sqli={} other={}",
                stats.idor, stats.default_creds, stats.ssrf, stats.xss, stats.sqli, stats.other,
            );
            Ok(())
        }
        Commands::Validate { file } => {
            let stats = analyze_dataset(&file)?;
            print!("{}", render_report(&file, &stats));
            if stats.invalid_examples > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Diagnose { input } => {
            let input = input.unwrap_or(config.raw_logs_dir);
            let (per_file, totals) = analyze_log_dir(&input)?;
            print!("{}", render_funnel(&per_file, &totals));
            Ok(())
        }
        Commands::Tokens { output } => {
            let output = output.unwrap_or(config.tokenizer_dir);
            let count = write_tokenizer_config(&output)?;
            println!(
                "Tokenizer configuration created at {} ({count} security tokens)",
                output.display()
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_a_file_argument() {
        let parsed = Cli::try_parse_from(["redtrace", "validate"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn augment_accepts_factor_and_seed() {
        let parsed = Cli::try_parse_from([
            "redtrace", "augment", "--factor", "0.5", "--seed", "42",
        ])
        .unwrap();
        let Commands::Augment { factor, seed, .. } = parsed.command else {
            panic!("expected augment subcommand");
        };
        assert_eq!(factor, Some(0.5));
        assert_eq!(seed, Some(42));
    }

    #[test]
    fn filter_thresholds_are_optional() {
        let parsed = Cli::try_parse_from(["redtrace", "filter"]).unwrap();
        let Commands::Filter {
            min_tool_calls,
            min_response_length,
            ..
        } = parsed.command
        else {
            panic!("expected filter subcommand");
        };
        assert!(min_tool_calls.is_none());
        assert!(min_response_length.is_none());
    }

    #[test]
    fn bare_invocation_is_an_error() {
        let parsed = Cli::try_parse_from(["redtrace"]);
        assert!(parsed.is_err());
    }
}
