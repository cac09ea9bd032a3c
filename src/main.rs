//! # Main — CLI Entry Point
//!
//! Routes subcommands to the experiment drivers in `cli.rs`. Every
//! subcommand prints a single JSON document on stdout; logs go to stderr so
//! the output can be piped straight into a plotting script.
//!
//! ## Subcommands
//!
//! - `check`: Miller–Rabin verdict for one integer.
//! - `rolling`: rolling false-positive rate over a candidate range.
//! - `base-impact`: per-base false positives over nested ranges, plus liars.
//! - `fingerprint`: adversarial fingerprinting with 0/1/2/4 parity bits.
//! - `remainder`: plain fingerprinting against the low-bit remainder defense.
//!
//! ## Global Options
//!
//! - `--config` / `LIARSCAN_CONFIG`: TOML experiment file (flags override it).
//! - `--seed`: RNG seed for reproducible runs.
//! - `--threads`: Rayon thread pool size (0 = all cores).
//! - `--pretty`: indent the JSON output.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "liarscan",
    about = "Measure Miller-Rabin liars and adversarial fingerprint collisions"
)]
struct Cli {
    /// TOML experiment configuration; command-line flags override its values
    #[arg(long, env = "LIARSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for the random witness and modulus draws
    #[arg(long)]
    seed: Option<u64>,

    /// Number of rayon worker threads (defaults to all logical cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run Miller-Rabin on a single integer
    Check {
        /// Integer to test (arbitrary precision, decimal)
        #[arg(long)]
        n: String,
        /// Explicit witnesses, comma separated (e.g. 2,7,61)
        #[arg(long, value_delimiter = ',', conflicts_with = "rounds")]
        bases: Option<Vec<u64>>,
        /// Number of random witnesses drawn from [2, n-2]
        #[arg(long)]
        rounds: Option<u32>,
    },
    /// Rolling false-positive rate of a fixed witness set
    Rolling {
        /// First candidate
        #[arg(long)]
        start: Option<u64>,
        /// Last candidate (inclusive)
        #[arg(long)]
        end: Option<u64>,
        /// Moving-average window size
        #[arg(long)]
        window: Option<usize>,
        /// Witnesses, comma separated
        #[arg(long, value_delimiter = ',')]
        bases: Option<Vec<u64>>,
    },
    /// False positives of single bases over nested ranges, and liar ranking
    BaseImpact {
        /// First candidate
        #[arg(long)]
        start: Option<u64>,
        /// Last candidate (inclusive); nested bounds are end/100, end/10, end
        #[arg(long)]
        end: Option<u64>,
        /// Bases compared, comma separated
        #[arg(long, value_delimiter = ',')]
        bases: Option<Vec<u64>>,
    },
    /// Adversarial fingerprinting with 0, 1, 2 and 4 parity bits
    Fingerprint {
        /// Smallest bit budget n
        #[arg(long)]
        n_min: Option<u64>,
        /// Largest bit budget n
        #[arg(long)]
        n_max: Option<u64>,
        /// Modulus draws per n
        #[arg(long)]
        trials: Option<u64>,
    },
    /// Plain fingerprinting against the y mod 2 remainder defense
    Remainder {
        /// Smallest bit budget n
        #[arg(long)]
        n_min: Option<u64>,
        /// Largest bit budget n
        #[arg(long)]
        n_max: Option<u64>,
        /// Modulus draws per n
        #[arg(long)]
        trials: Option<u64>,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for machine-readable logs, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    cli::configure_rayon(cli.threads);
    let config = cli::resolve_config(&cli)?;

    match &cli.command {
        Commands::Check { n, bases, rounds } => {
            cli::run_check(&cli, &config, n, bases.as_deref(), *rounds)
        }
        Commands::Rolling { .. } => cli::run_rolling(&cli, &config),
        Commands::BaseImpact { .. } => cli::run_base_impact(&cli, &config),
        Commands::Fingerprint { .. } => cli::run_fingerprint(&cli, &config),
        Commands::Remainder { .. } => cli::run_remainder(&cli, &config),
    }
}
