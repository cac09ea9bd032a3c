//! # Adversary — Prime-Product Inputs Against Fingerprinting
//!
//! Alice picks her modulus p uniformly from the primes in (n, n²]. An
//! adversary who controls `y` (with `x = 0` on Bob's side) wins whenever
//! `p | y`. The best it can do under a bit budget of n is to pack as many of
//! those candidate primes into `y` as fit below 2^n, smallest first.
//!
//! Two strategies are modeled:
//!
//! - [`Strategy::Greedy`]: running product of pool primes while the product
//!   stays below 2^n.
//! - [`Strategy::Even`]: the same product built against a budget of 2^(n-1)
//!   and then doubled, so `y mod 2 == 0` matches `x = 0` when Alice also
//!   sends the low remainder bit. This is one counter-strategy, not a proven
//!   optimum.

use anyhow::{bail, ensure, Result};
use rug::Integer;
use serde::{Deserialize, Serialize};

use crate::sieve::PrimeSet;

/// How the adversary assembles `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Greedy,
    Even,
}

/// An adversarially chosen secret and the pool primes it is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdversarialY {
    pub value: Integer,
    /// Odd prime factors drawn from the pool, ascending.
    pub factors: Vec<u64>,
}

impl AdversarialY {
    pub fn bit_length(&self) -> u32 {
        self.value.significant_bits()
    }

    /// Number of pool primes that divide `y`; each one is a winning draw.
    pub fn pool_hits(&self) -> usize {
        self.factors.len()
    }
}

/// Primes in `(n, n²]`, the range Alice draws her modulus from.
///
/// Fails when the oracle does not reach `n²` or the range holds no prime.
pub fn candidate_pool(oracle: &PrimeSet, n: u64) -> Result<&[u64]> {
    let hi = match n.checked_mul(n) {
        Some(hi) => hi,
        None => bail!("n={} overflows the candidate range bound n²", n),
    };
    ensure!(
        oracle.covers(hi),
        "candidate range (n, n²] for n={} reaches {} but the prime oracle stops at {}",
        n,
        hi,
        oracle.limit()
    );
    let pool = oracle.range(n + 1, hi);
    ensure!(!pool.is_empty(), "no primes in (n, n²] for n={}: pick a larger n", n);
    Ok(pool)
}

/// Multiply pool primes in ascending order while `product · p · extra < 2^budget`.
fn bounded_product(pool: &[u64], budget_bits: u32, extra: u32) -> (Integer, Vec<u64>) {
    let limit = Integer::from(1) << budget_bits;
    let mut product = Integer::from(1);
    let mut factors = Vec::new();
    for &p in pool {
        let next = Integer::from(&product * p) * extra;
        if next >= limit {
            break;
        }
        product = Integer::from(&product * p);
        factors.push(p);
    }
    (product, factors)
}

/// Build `y` from `pool` under a budget of `budget_bits` bits.
///
/// `Even` spends one bit on the factor 2, so it needs `budget_bits >= 2`
/// to produce a value below the budget.
pub fn build(pool: &[u64], budget_bits: u32, strategy: Strategy) -> AdversarialY {
    let (value, factors) = match strategy {
        Strategy::Greedy => bounded_product(pool, budget_bits, 1),
        Strategy::Even => {
            let (product, factors) = bounded_product(pool, budget_bits, 2);
            (product * 2u32, factors)
        }
    };
    AdversarialY { value, factors }
}
