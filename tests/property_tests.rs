//! Property-based tests for liarscan's primitives.
//!
//! These tests use `proptest` to check invariants across randomly generated
//! inputs: the fingerprint codec, the Miller–Rabin core, the adversary's bit
//! budget, the rolling-rate window and the prime oracle.
//!
//! # How to run
//!
//! ```bash
//! cargo test --test property_tests
//!
//! # Increase case count for thorough testing (default is 256):
//! PROPTEST_CASES=10000 cargo test --test property_tests
//! ```
//!
//! Each property is named `prop_<function>_<invariant>`.

use liarscan::adversary;
use liarscan::codec::{self, ParityWidth};
use liarscan::harness::RollingRate;
use liarscan::miller_rabin::{self, Verdict};
use liarscan::protocol;
use liarscan::sieve::PrimeSet;
use proptest::prelude::*;
use rug::integer::IsPrime;
use rug::Integer;
use std::sync::OnceLock;

/// Deterministic below 341,550,071,728,321.
const DETERMINISTIC_BASES: [u64; 7] = [2, 3, 5, 7, 11, 13, 17];

fn oracle() -> &'static PrimeSet {
    static ORACLE: OnceLock<PrimeSet> = OnceLock::new();
    ORACLE.get_or_init(|| PrimeSet::new(200_000))
}

fn width() -> impl Strategy<Value = ParityWidth> {
    prop::sample::select(ParityWidth::ALL.to_vec())
}

// == Codec ====================================================================

proptest! {
    /// Decoding an encoded modulus recovers the modulus and the parity of the
    /// secret, never the parity of the modulus.
    #[test]
    fn prop_decode_inverts_encode(p in 2u64..u64::MAX, y in any::<u128>(), w in width()) {
        let value = Integer::from(p);
        let secret = Integer::from(y);
        let encoded = codec::encode(&value, &secret, w);
        let (decoded, parity) = codec::decode(&encoded);
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(parity, w.parity_of(&secret));
        prop_assert!(parity < w.modulus());
    }

    /// Popcount agrees with GMP for every non-negative value.
    #[test]
    fn prop_popcount_matches_gmp(y in any::<u128>()) {
        let v = Integer::from(y);
        prop_assert_eq!(Some(codec::popcount(&v)), v.count_ones());
    }

    /// The encoded fingerprint is exactly k bits longer than the modulus.
    #[test]
    fn prop_encoded_length_adds_parity_bits(p in 1u64..u64::MAX, y in any::<u64>(), w in width()) {
        let value = Integer::from(p);
        let encoded = codec::encode(&value, &Integer::from(y), w);
        prop_assert_eq!(encoded.bit_length(), codec::bit_length(&value) + w.bits());
    }
}

// == Miller–Rabin =============================================================

proptest! {
    /// With the first seven primes as bases the test is exact in this range,
    /// so it must agree with GMP.
    #[test]
    fn prop_miller_rabin_matches_gmp(n in 0u64..1_000_000_000) {
        let ours = miller_rabin::is_probable_prime_u64(n, &DETERMINISTIC_BASES);
        let gmp = Integer::from(n).is_probably_prime(30) != IsPrime::No;
        prop_assert_eq!(ours.is_probably_prime(), gmp);
    }

    /// Primes pass every base.
    #[test]
    fn prop_primes_pass_any_bases(
        idx in 0usize..10_000,
        bases in prop::collection::vec(2u64..1_000_000, 0..6),
    ) {
        let p = oracle().as_slice()[idx];
        prop_assert_eq!(miller_rabin::is_probable_prime_u64(p, &bases), Verdict::ProbablyPrime);
    }

    /// Adding bases can only turn "probably prime" into "composite".
    #[test]
    fn prop_more_bases_never_accept_more(
        n in 31u64..200_000,
        bases in prop::collection::vec(2u64..1_000, 1..4),
        extra in 2u64..1_000,
    ) {
        let mut wider = bases.clone();
        wider.push(extra);
        let narrow = miller_rabin::is_probable_prime_u64(n, &bases);
        let wide = miller_rabin::is_probable_prime_u64(n, &wider);
        if wide.is_probably_prime() {
            prop_assert!(narrow.is_probably_prime());
        }
    }
}

// == Adversary and protocol ===================================================

proptest! {
    /// Both strategies stay inside the bit budget and only use pool primes.
    #[test]
    fn prop_adversary_respects_budget(n in 2u64..=400) {
        let pool = adversary::candidate_pool(oracle(), n).unwrap();
        for strategy in [adversary::Strategy::Greedy, adversary::Strategy::Even] {
            let adv = adversary::build(pool, n as u32, strategy);
            prop_assert!(adv.value < (Integer::from(1) << n as u32));
            for f in &adv.factors {
                prop_assert!(pool.binary_search(f).is_ok());
                prop_assert!(adv.value.is_divisible_u(*f as u32));
            }
        }
    }

    /// Bob always accepts an honest equal value, at every parity width.
    #[test]
    fn prop_honest_equality_accepted(y in any::<u128>(), idx in 0usize..1_000) {
        let p = oracle().as_slice()[idx];
        let v = Integer::from(y);
        let outcome = protocol::run_trial(&v, &v, p).unwrap();
        prop_assert_eq!(outcome.accepted, [true; 4]);
    }
}

// == Harness and oracle =======================================================

proptest! {
    /// The O(1) rolling average equals a direct recount of the window.
    #[test]
    fn prop_rolling_rate_matches_recount(
        flags in prop::collection::vec(any::<bool>(), 1..400),
        window in 1usize..50,
    ) {
        let mut rolling = RollingRate::new(window).unwrap();
        for (i, &f) in flags.iter().enumerate() {
            let got = rolling.push(f);
            let lo = (i + 1).saturating_sub(window);
            let slice = &flags[lo..=i];
            let expected = slice.iter().filter(|&&b| b).count() as f64 / slice.len() as f64;
            prop_assert!((got - expected).abs() < 1e-12, "i={} got={} expected={}", i, got, expected);
        }
    }

    /// `range` returns exactly the primes in `[lo, hi]`.
    #[test]
    fn prop_prime_range_matches_filter(lo in 0u64..5_000, len in 0u64..2_000) {
        let hi = lo + len;
        let expected: Vec<u64> = (lo..=hi).filter(|&n| oracle().contains(n)).collect();
        prop_assert_eq!(oracle().range(lo, hi), expected.as_slice());
    }
}
