//! # Sweep — Fingerprinting Experiments Across Bit Budgets
//!
//! Runs [`protocol::simulate`] and [`protocol::simulate_remainder`] for every
//! budget `n` in a range and returns the points in increasing `n`, ready for
//! an external plotter.
//!
//! Points are independent, so each `n` runs on the rayon pool with its own
//! generator, `SeededSource::derive(seed, n)`. A sweep is therefore
//! reproducible for a given seed regardless of thread count.

use anyhow::{ensure, Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::protocol::{self, FingerprintPoint, RemainderPoint};
use crate::rng::SeededSource;
use crate::sieve::PrimeSet;

/// Inclusive range of bit budgets plus the per-point trial count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepParams {
    pub n_min: u64,
    pub n_max: u64,
    pub trials: u64,
    pub seed: u64,
}

impl SweepParams {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.n_min <= self.n_max,
            "empty sweep: n_min {} exceeds n_max {}",
            self.n_min,
            self.n_max
        );
        ensure!(self.n_min >= 2, "n_min must be at least 2 (got {})", self.n_min);
        ensure!(
            self.n_max <= u64::from(u32::MAX),
            "n_max {} does not fit a bit budget",
            self.n_max
        );
        Ok(())
    }

    /// Oracle bound needed to label every candidate pool: `n_max²`.
    pub fn oracle_limit(&self) -> Result<u64> {
        self.n_max
            .checked_mul(self.n_max)
            .with_context(|| format!("n_max {} squared overflows u64", self.n_max))
    }

    fn budgets(&self) -> Vec<u64> {
        (self.n_min..=self.n_max).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FingerprintSeries {
    pub params: SweepParams,
    pub points: Vec<FingerprintPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemainderSeries {
    pub params: SweepParams,
    pub points: Vec<RemainderPoint>,
}

pub fn fingerprint_sweep(oracle: &PrimeSet, params: SweepParams) -> Result<FingerprintSeries> {
    params.validate()?;
    info!(n_min = params.n_min, n_max = params.n_max, trials = params.trials, "fingerprint sweep");
    let points = params
        .budgets()
        .par_iter()
        .map(|&n| {
            let mut rng = SeededSource::derive(params.seed, n);
            protocol::simulate(oracle, n, params.trials, &mut rng)
        })
        .collect::<Result<Vec<_>>>()?;
    info!(points = points.len(), "fingerprint sweep complete");
    Ok(FingerprintSeries { params, points })
}

pub fn remainder_sweep(oracle: &PrimeSet, params: SweepParams) -> Result<RemainderSeries> {
    params.validate()?;
    info!(n_min = params.n_min, n_max = params.n_max, trials = params.trials, "remainder sweep");
    let points = params
        .budgets()
        .par_iter()
        .map(|&n| {
            let mut rng = SeededSource::derive(params.seed, n);
            protocol::simulate_remainder(oracle, n, params.trials, &mut rng)
        })
        .collect::<Result<Vec<_>>>()?;
    info!(points = points.len(), "remainder sweep complete");
    Ok(RemainderSeries { params, points })
}
