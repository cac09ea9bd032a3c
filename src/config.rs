//! TOML experiment configuration: parsing, defaults, and validation.
//!
//! Every field has a built-in default, so an empty file (or no file) is a
//! valid configuration. Command-line flags are applied on top by the binary
//! and the result is validated once before any experiment runs.

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::harness::first_duplicate;

/// Largest fingerprint budget accepted. The oracle must reach `n_max²`.
pub const MAX_FINGERPRINT_N: u64 = 10_000;

/// Top-level configuration, mapping the root table plus the
/// `[miller_rabin]` and `[fingerprint]` sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub miller_rabin: MillerRabinConfig,
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
}

fn default_seed() -> u64 {
    5080
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            seed: default_seed(),
            miller_rabin: MillerRabinConfig::default(),
            fingerprint: FingerprintConfig::default(),
        }
    }
}

/// The `[miller_rabin]` section: candidate range and witness sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MillerRabinConfig {
    pub start: u64,
    pub end: u64,
    pub window: usize,
    /// Witness set for the rolling false-positive sweep.
    pub bases: Vec<u64>,
    /// Single bases compared against each other in the base-impact view.
    pub impact_bases: Vec<u64>,
    /// Random witnesses per test when no explicit bases are given.
    pub rounds: u32,
}

impl Default for MillerRabinConfig {
    fn default() -> Self {
        MillerRabinConfig {
            start: 100,
            end: 1_000_000,
            window: 100_000,
            bases: vec![2, 7, 61],
            impact_bases: vec![2, 3, 4, 5, 10, 11, 12, 16, 17, 19, 25, 29, 31, 32],
            rounds: 5,
        }
    }
}

/// The `[fingerprint]` section: bit-budget range and trials per point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FingerprintConfig {
    pub n_min: u64,
    pub n_max: u64,
    pub trials: u64,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        FingerprintConfig {
            n_min: 6,
            n_max: 200,
            trials: 10_000,
        }
    }
}

/// Parse a configuration from TOML text and validate it.
pub fn parse(text: &str) -> Result<ExperimentConfig> {
    let config: ExperimentConfig = toml::from_str(text).context("invalid experiment config")?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a configuration file.
pub fn load(path: &Path) -> Result<ExperimentConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse(&text).with_context(|| format!("in config {}", path.display()))
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        self.miller_rabin.validate()?;
        self.fingerprint.validate()
    }
}

impl MillerRabinConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.start <= self.end,
            "miller_rabin.start {} exceeds end {}",
            self.start,
            self.end
        );
        ensure!(self.window > 0, "miller_rabin.window must be positive");
        ensure!(!self.bases.is_empty(), "miller_rabin.bases must name at least one base");
        ensure!(
            !self.impact_bases.is_empty(),
            "miller_rabin.impact_bases must name at least one base"
        );
        ensure!(
            self.bases.iter().chain(&self.impact_bases).all(|&a| a >= 2),
            "Miller-Rabin bases must be at least 2"
        );
        if let Some(dup) = first_duplicate(&self.impact_bases) {
            bail!("miller_rabin.impact_bases lists base {} more than once", dup);
        }
        ensure!(self.rounds > 0, "miller_rabin.rounds must be positive");
        Ok(())
    }
}

impl FingerprintConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.n_min >= 2,
            "fingerprint.n_min must be at least 2 (got {})",
            self.n_min
        );
        ensure!(
            self.n_min <= self.n_max,
            "fingerprint.n_min {} exceeds n_max {}",
            self.n_min,
            self.n_max
        );
        ensure!(
            self.n_max <= MAX_FINGERPRINT_N,
            "fingerprint.n_max {} exceeds the supported maximum {}",
            self.n_max,
            MAX_FINGERPRINT_N
        );
        Ok(())
    }
}
