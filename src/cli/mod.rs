//! safedata CLI - privacy risk, protection and utility for tabular data
//!
//! Command-line interface for safedata operations.

use std::{path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod assess;
mod pipeline;
mod protect;
mod utility;

/// safedata - privacy/utility evaluation for tabular datasets
#[derive(Parser)]
#[command(name = "safedata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline described by a configuration file
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config/config.yaml")]
        config: PathBuf,
        /// Seed for noise and synthetic sampling
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Assess re-identification risk of a dataset
    Assess {
        /// Dataset file
        input: PathBuf,
        /// Ground-truth table for the linkage attack
        #[arg(short, long)]
        ground_truth: Option<PathBuf>,
        /// Quasi-identifier columns (comma-separated)
        #[arg(short, long, value_delimiter = ',', default_value = "age,location")]
        qi: Vec<String>,
        /// Groups smaller than this are reported as risky
        #[arg(short, long, default_value = "5")]
        threshold: usize,
        /// Identifier column
        #[arg(long, default_value = "id")]
        identifier: String,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Write a protected copy of a dataset
    Protect {
        /// Dataset file
        input: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Generalize age and location
        #[arg(long)]
        generalize: bool,
        /// Add Laplace noise with this epsilon
        #[arg(short, long)]
        epsilon: Option<f64>,
        /// Replace the data with this many synthetic records
        #[arg(short, long)]
        synthetic: Option<usize>,
        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Identifier column
        #[arg(long, default_value = "id")]
        identifier: String,
    },
    /// Measure utility of a protected dataset against its original
    Utility {
        /// Original dataset
        #[arg(long)]
        original: PathBuf,
        /// Protected dataset
        #[arg(long)]
        protected: PathBuf,
        /// Identifier column
        #[arg(long, default_value = "id")]
        identifier: String,
        /// Target column of the proxy classification task
        #[arg(long, default_value = "income")]
        target: String,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Write a configuration file with default values
    InitConfig {
        /// Destination path
        #[arg(default_value = "config/config.yaml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Installs the stderr log layer. `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "safedata=info",
        1 => "safedata=debug",
        _ => "safedata=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
}

/// Main entry point for the CLI.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { config, seed } => pipeline::cmd_run(&config, seed),
        Commands::Assess {
            input,
            ground_truth,
            qi,
            threshold,
            identifier,
            format,
        } => assess::cmd_assess(
            &input,
            ground_truth.as_deref(),
            &qi,
            threshold,
            &identifier,
            &format,
        ),
        Commands::Protect {
            input,
            output,
            generalize,
            epsilon,
            synthetic,
            seed,
            identifier,
        } => protect::cmd_protect(
            &input,
            &output,
            &protect::ProtectOptions {
                generalize,
                epsilon,
                synthetic,
                seed,
                identifier,
            },
        ),
        Commands::Utility {
            original,
            protected,
            identifier,
            target,
            format,
        } => utility::cmd_utility(&original, &protected, &identifier, &target, &format),
        Commands::InitConfig { path, force } => pipeline::cmd_init_config(&path, force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Prints a value as pretty JSON.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> crate::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| crate::Error::render(format!("cannot serialize output: {e}")))?;
    println!("{json}");
    Ok(())
}
