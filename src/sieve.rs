//! # Sieve — Ground-Truth Prime Tables
//!
//! Supplies the exact prime labels that every experiment is scored against.
//! Provides:
//!
//! 1. **Prime generation** via a wheel-30 sieve of Eratosthenes (26.7% memory
//!    of naive sieve — stores only residues coprime to {2, 3, 5}).
//! 2. **`PrimeSet`**, the immutable oracle built on top of it: membership
//!    (`contains`) and ordered inclusive slices (`range`), both by binary search.
//!
//! The oracle is exact up to its construction bound and makes no claim above
//! it. Callers check `covers` before trusting a negative answer.
//!
//! ## Algorithm: Wheel-30 Sieve
//!
//! The sieve tracks only integers coprime to 30 = 2·3·5 (8 residues per 30).
//! Each segment of 30 consecutive integers is packed into a single byte.
//! Complexity: O(n log log n) time, O(n/30) space.

use tracing::debug;

/// Residues coprime to 30: these are the only positions the wheel tracks.
const RESIDUES: [u8; 8] = [1, 7, 11, 13, 17, 19, 23, 29];

/// Map residue → bit index in the wheel byte (255 for residues sharing a factor with 30).
const RES_TO_IDX: [u8; 30] = [
    255, 0, 255, 255, 255, 255, 255, 1, 255, 255, 255, 2, 255, 3, 255, 255, 255, 4, 255, 5, 255,
    255, 255, 6, 255, 255, 255, 255, 255, 7,
];

/// Generate all primes up to `limit` (inclusive) using a wheel-30 sieve.
pub fn generate_primes(limit: u64) -> Vec<u64> {
    if limit < 2 {
        return vec![];
    }
    if limit < 7 {
        return [2, 3, 5].iter().copied().filter(|&p| p <= limit).collect();
    }

    let limit = limit as usize;
    let num_segments = limit / 30 + 1;
    // One bit per spoke; all set = every spoke still a prime candidate
    let mut wheel = vec![0xFFu8; num_segments];

    let sqrt_limit = (limit as f64).sqrt() as usize + 1;
    'outer: for seg in 0..num_segments {
        for &ri in &RESIDUES {
            let n = seg * 30 + ri as usize;
            if n < 7 {
                continue;
            }
            if n > sqrt_limit {
                break 'outer;
            }
            if wheel[seg] & (1 << RES_TO_IDX[ri as usize]) == 0 {
                continue;
            }
            let mut m = n * n;
            while m <= limit {
                let idx = RES_TO_IDX[m % 30];
                if idx != 255 {
                    wheel[m / 30] &= !(1 << idx);
                }
                m += n;
            }
        }
    }

    let mut primes = Vec::with_capacity(estimate_prime_count(limit));
    primes.extend_from_slice(&[2, 3, 5]);
    for (seg, &byte) in wheel.iter().enumerate() {
        if byte == 0 {
            continue;
        }
        for (bit, &r) in RESIDUES.iter().enumerate() {
            if byte & (1 << bit) != 0 {
                let n = seg * 30 + r as usize;
                if n > 5 && n <= limit {
                    primes.push(n as u64);
                }
            }
        }
    }
    primes
}

/// Upper-leaning estimate of pi(n), used only to size the output vector.
fn estimate_prime_count(n: usize) -> usize {
    if n < 10 {
        return 4;
    }
    let nf = n as f64;
    (1.3 * nf / nf.ln()) as usize
}

/// Immutable, ordered, deduplicated set of every prime up to `limit`.
#[derive(Debug, Clone)]
pub struct PrimeSet {
    primes: Vec<u64>,
    limit: u64,
}

impl PrimeSet {
    pub fn new(limit: u64) -> Self {
        let primes = generate_primes(limit);
        debug!(limit, count = primes.len(), "prime oracle built");
        PrimeSet { primes, limit }
    }

    /// Construction bound: answers are exact for every `n <= limit`.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// True when `n` lies inside the range this oracle can label.
    pub fn covers(&self, n: u64) -> bool {
        n <= self.limit
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    pub fn contains(&self, n: u64) -> bool {
        self.primes.binary_search(&n).is_ok()
    }

    /// Primes in `[lo, hi]`, ascending. Empty when `lo > hi`.
    pub fn range(&self, lo: u64, hi: u64) -> &[u64] {
        if lo > hi {
            return &[];
        }
        let start = self.primes.partition_point(|&p| p < lo);
        let end = self.primes.partition_point(|&p| p <= hi);
        &self.primes[start..end]
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.primes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Prime Generation (Wheel-30 Sieve of Eratosthenes) ──────────────

    #[test]
    fn test_generate_primes() {
        let primes = generate_primes(30);
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    /// Limits 0 and 1 produce nothing; 2 through 11 walk the axle primes
    /// (2, 3, 5) into the first spoke prime.
    #[test]
    fn test_generate_primes_small_limits() {
        assert_eq!(generate_primes(0), Vec::<u64>::new());
        assert_eq!(generate_primes(1), Vec::<u64>::new());
        assert_eq!(generate_primes(2), vec![2]);
        assert_eq!(generate_primes(4), vec![2, 3]);
        assert_eq!(generate_primes(6), vec![2, 3, 5]);
        assert_eq!(generate_primes(7), vec![2, 3, 5, 7]);
        assert_eq!(generate_primes(10), vec![2, 3, 5, 7]);
        assert_eq!(generate_primes(11), vec![2, 3, 5, 7, 11]);
    }

    /// pi(x) from OEIS A000720.
    #[test]
    fn test_generate_primes_known_count() {
        assert_eq!(generate_primes(100).len(), 25);
        assert_eq!(generate_primes(1000).len(), 168);
        assert_eq!(generate_primes(10000).len(), 1229);
        assert_eq!(generate_primes(100000).len(), 9592);
    }

    #[test]
    fn test_generate_primes_boundary_around_30() {
        assert_eq!(generate_primes(31).last(), Some(&31));
        assert_eq!(generate_primes(59).len(), 17);
        assert_eq!(generate_primes(60).len(), 17);
        assert_eq!(generate_primes(61).len(), 18);
    }

    // ── PrimeSet Oracle ────────────────────────────────────────────────

    #[test]
    fn contains_matches_trial_division() {
        let set = PrimeSet::new(2_000);
        for n in 0..=2_000u64 {
            let expected = n >= 2 && (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0);
            assert_eq!(set.contains(n), expected, "oracle disagrees at {}", n);
        }
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let set = PrimeSet::new(100);
        assert_eq!(set.range(7, 31), &[7, 11, 13, 17, 19, 23, 29, 31]);
        assert_eq!(set.range(8, 30), &[11, 13, 17, 19, 23, 29]);
        assert_eq!(set.range(90, 100), &[97]);
    }

    #[test]
    fn range_empty_cases() {
        let set = PrimeSet::new(100);
        assert!(set.range(24, 28).is_empty());
        assert!(set.range(50, 10).is_empty());
        assert!(set.range(101, 200).is_empty());
    }

    #[test]
    fn covers_tracks_construction_bound() {
        let set = PrimeSet::new(1_000);
        assert_eq!(set.limit(), 1_000);
        assert!(set.covers(1_000));
        assert!(!set.covers(1_001));
        assert_eq!(set.len(), 168);
        assert!(!set.is_empty());
        assert!(PrimeSet::new(1).is_empty());
    }
}
