//! # CLI Execution Functions
//!
//! Kept out of `main.rs` so the entry point stays a routing table. Each
//! `run_*` function folds the subcommand's flags over the loaded
//! configuration, builds the prime oracle the experiment needs, runs it, and
//! prints the resulting series as JSON.

use anyhow::{Context, Result};
use liarscan::config::{self, ExperimentConfig};
use liarscan::harness;
use liarscan::miller_rabin::{self, Verdict};
use liarscan::rng::SeededSource;
use liarscan::sieve::PrimeSet;
use liarscan::sweep::{self, SweepParams};
use rug::Integer;
use serde::Serialize;
use tracing::{info, warn};

use super::{Cli, Commands};

// ── Configuration ───────────────────────────────────────────────

/// Load the config file (or defaults) and apply every flag given on the
/// command line, then validate the merged result.
pub fn resolve_config(cli: &Cli) -> Result<ExperimentConfig> {
    let mut cfg = match &cli.config {
        Some(path) => config::load(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }

    let mr = &mut cfg.miller_rabin;
    let fp = &mut cfg.fingerprint;
    match &cli.command {
        Commands::Check { rounds, .. } => {
            if let Some(r) = rounds {
                mr.rounds = *r;
            }
        }
        Commands::Rolling {
            start,
            end,
            window,
            bases,
        } => {
            override_with(&mut mr.start, start);
            override_with(&mut mr.end, end);
            override_with(&mut mr.window, window);
            override_with(&mut mr.bases, bases);
        }
        Commands::BaseImpact { start, end, bases } => {
            override_with(&mut mr.start, start);
            override_with(&mut mr.end, end);
            override_with(&mut mr.impact_bases, bases);
        }
        Commands::Fingerprint {
            n_min,
            n_max,
            trials,
        }
        | Commands::Remainder {
            n_min,
            n_max,
            trials,
        } => {
            override_with(&mut fp.n_min, n_min);
            override_with(&mut fp.n_max, n_max);
            override_with(&mut fp.trials, trials);
        }
    }

    cfg.validate().context("invalid experiment parameters")?;
    Ok(cfg)
}

fn override_with<T: Clone>(slot: &mut T, flag: &Option<T>) {
    if let Some(v) = flag {
        *slot = v.clone();
    }
}

fn emit<T: Serialize>(cli: &Cli, value: &T) -> Result<()> {
    let json = if cli.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

fn sweep_params(cfg: &ExperimentConfig) -> SweepParams {
    SweepParams {
        n_min: cfg.fingerprint.n_min,
        n_max: cfg.fingerprint.n_max,
        trials: cfg.fingerprint.trials,
        seed: cfg.seed,
    }
}

// ── Miller–Rabin ────────────────────────────────────────────────

#[derive(Serialize)]
struct CheckReport<'a> {
    n: String,
    verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    bases: Option<&'a [u64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

pub fn run_check(
    cli: &Cli,
    cfg: &ExperimentConfig,
    n: &str,
    bases: Option<&[u64]>,
    rounds: Option<u32>,
) -> Result<()> {
    let value: Integer = n
        .trim()
        .parse()
        .with_context(|| format!("not a decimal integer: {:?}", n))?;

    let report = match bases {
        Some(list) => {
            let witnesses: Vec<Integer> = list.iter().map(|&a| Integer::from(a)).collect();
            CheckReport {
                n: value.to_string(),
                verdict: miller_rabin::is_probable_prime(&value, &witnesses),
                bases: Some(list),
                rounds: None,
                seed: None,
            }
        }
        None => {
            let rounds = rounds.unwrap_or(cfg.miller_rabin.rounds);
            let mut rng = SeededSource::new(cfg.seed);
            CheckReport {
                n: value.to_string(),
                verdict: miller_rabin::is_probable_prime_random(&value, rounds, &mut rng),
                bases: None,
                rounds: Some(rounds),
                seed: Some(cfg.seed),
            }
        }
    };
    info!(n = %report.n, verdict = %report.verdict, "check complete");
    emit(cli, &report)
}

pub fn run_rolling(cli: &Cli, cfg: &ExperimentConfig) -> Result<()> {
    let mr = &cfg.miller_rabin;
    let oracle = PrimeSet::new(mr.end);
    let series =
        harness::rolling_false_positive_rate(&oracle, mr.start, mr.end, &mr.bases, mr.window)?;
    emit(cli, &series)
}

pub fn run_base_impact(cli: &Cli, cfg: &ExperimentConfig) -> Result<()> {
    let mr = &cfg.miller_rabin;
    let oracle = PrimeSet::new(mr.end);
    let bounds = harness::nested_bounds(mr.start, mr.end);
    let impact = harness::base_impact(&oracle, mr.start, &bounds, &mr.impact_bases)?;
    info!(
        liars = impact.liars.liars.len(),
        most_fooled = impact.liars.histogram.len(),
        "base impact complete"
    );
    emit(cli, &impact)
}

// ── Fingerprinting ──────────────────────────────────────────────

pub fn run_fingerprint(cli: &Cli, cfg: &ExperimentConfig) -> Result<()> {
    let params = sweep_params(cfg);
    let oracle = PrimeSet::new(params.oracle_limit()?);
    let series = sweep::fingerprint_sweep(&oracle, params)?;
    emit(cli, &series)
}

pub fn run_remainder(cli: &Cli, cfg: &ExperimentConfig) -> Result<()> {
    let params = sweep_params(cfg);
    let oracle = PrimeSet::new(params.oracle_limit()?);
    let series = sweep::remainder_sweep(&oracle, params)?;
    emit(cli, &series)
}

// ── Rayon ───────────────────────────────────────────────────────

/// Size the global rayon pool. `None` or 0 keeps rayon's default (all cores).
pub fn configure_rayon(threads: Option<usize>) {
    let num_threads = threads.unwrap_or(0);
    if num_threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
        {
            warn!(error = %e, "Could not configure rayon thread pool");
        }
    }
}
