//! # Miller–Rabin — Strong Probable-Prime Test with Explicit Witnesses
//!
//! Unlike GMP's `is_probably_prime`, which picks its own bases, this test runs
//! exactly the witnesses the caller names. That is the point: the harness
//! studies *which* bases a composite can fool, so base selection must be
//! observable and reproducible.
//!
//! ## Algorithm
//!
//! Write n − 1 = d · 2^s with d odd. For a base a, compute x = a^d mod n.
//! The base passes if x = 1 or x = n − 1, or if one of the next s − 1
//! squarings reaches n − 1. Otherwise a is a witness to compositeness and
//! the verdict is final: no later base is evaluated.
//!
//! The test is one-sided. `Composite` is always correct; `ProbablyPrime` on a
//! composite n means every tested base is a strong liar for n.
//!
//! ## References
//!
//! - Michael O. Rabin, "Probabilistic Algorithm for Testing Primality",
//!   Journal of Number Theory, 12(1):128–138, 1980.

use rug::Integer;
use serde::{Deserialize, Serialize};

use crate::rng::UniformSource;

/// Primes used for the trial-division fast path before any witness runs.
pub const FAST_PATH_PRIMES: [u32; 10] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29];

/// Outcome of one witness round, and of a whole test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Composite,
    ProbablyPrime,
}

impl Verdict {
    pub fn is_probably_prime(self) -> bool {
        self == Verdict::ProbablyPrime
    }
}

impl From<bool> for Verdict {
    fn from(probably_prime: bool) -> Self {
        if probably_prime {
            Verdict::ProbablyPrime
        } else {
            Verdict::Composite
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Composite => write!(f, "composite"),
            Verdict::ProbablyPrime => write!(f, "probably_prime"),
        }
    }
}

/// Trial division by [`FAST_PATH_PRIMES`]. `None` means no decision yet.
fn fast_path(n: &Integer) -> Option<Verdict> {
    for &p in &FAST_PATH_PRIMES {
        if *n == p {
            return Some(Verdict::ProbablyPrime);
        }
        if n.is_divisible_u(p) {
            return Some(Verdict::Composite);
        }
    }
    None
}

/// Split `n - 1` into `(d, s)` with `d` odd and `n - 1 = d · 2^s`.
///
/// `n` must be odd and at least 3.
pub fn decompose(n: &Integer) -> (Integer, u32) {
    let mut d = Integer::from(n - 1u32);
    let mut s = 0u32;
    while d.is_even() {
        d >>= 1u32;
        s += 1;
    }
    (d, s)
}

/// Run a single strong-probable-prime round for base `a`.
///
/// `d` and `s` come from [`decompose`]. A base that is a multiple of `n`
/// says nothing about `n` and passes.
pub fn witness(n: &Integer, a: &Integer, d: &Integer, s: u32) -> Verdict {
    let n_minus_1 = Integer::from(n - 1u32);
    let mut a = Integer::from(a % n);
    if a < 0 {
        a += n;
    }
    if a == 0 {
        return Verdict::ProbablyPrime;
    }
    // n is odd and > 1 here, so the modulus is valid and d >= 0.
    let mut x = match a.pow_mod_ref(d, n) {
        Some(x) => Integer::from(x),
        None => return Verdict::Composite,
    };
    if x == 1 || x == n_minus_1 {
        return Verdict::ProbablyPrime;
    }
    for _ in 1..s {
        x.square_mut();
        x %= n;
        if x == n_minus_1 {
            return Verdict::ProbablyPrime;
        }
    }
    Verdict::Composite
}

/// Test `n` against every base in `bases`, in order.
///
/// Returns `Composite` for `n < 2` and as soon as any base proves
/// compositeness. An empty base list leaves survivors of the fast path at
/// `ProbablyPrime`.
pub fn is_probable_prime(n: &Integer, bases: &[Integer]) -> Verdict {
    if *n < 2 {
        return Verdict::Composite;
    }
    if let Some(v) = fast_path(n) {
        return v;
    }
    let (d, s) = decompose(n);
    for a in bases {
        if witness(n, a, &d, s) == Verdict::Composite {
            return Verdict::Composite;
        }
    }
    Verdict::ProbablyPrime
}

/// Convenience wrapper for `u64` candidates and bases.
pub fn is_probable_prime_u64(n: u64, bases: &[u64]) -> Verdict {
    let bases: Vec<Integer> = bases.iter().map(|&a| Integer::from(a)).collect();
    is_probable_prime(&Integer::from(n), &bases)
}

/// Test `n` with `rounds` witnesses drawn uniformly from `[2, n - 2]`.
///
/// Witnesses are drawn lazily, so a composite stops consuming randomness at
/// the first base that exposes it.
pub fn is_probable_prime_random(n: &Integer, rounds: u32, rng: &mut dyn UniformSource) -> Verdict {
    if *n < 2 {
        return Verdict::Composite;
    }
    if let Some(v) = fast_path(n) {
        return v;
    }
    // Past the fast path n >= 31, so [2, n - 2] is never empty.
    let (d, s) = decompose(n);
    let lo = Integer::from(2);
    let hi = Integer::from(n - 2u32);
    for _ in 0..rounds {
        let a = rng.uniform(&lo, &hi);
        if witness(n, &a, &d, s) == Verdict::Composite {
            return Verdict::Composite;
        }
    }
    Verdict::ProbablyPrime
}
