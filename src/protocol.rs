//! # Protocol — Simulated Fingerprint Equality Test
//!
//! Three roles, all in-process:
//!
//! - **Alice** holds `y`, draws a prime `p` from the candidate pool (n, n²]
//!   and sends `(p, y mod p)`, with `p` optionally carrying parity bits of
//!   `y` and optionally followed by the single bit `y mod 2`.
//! - **Bob** holds `x` and accepts "x = y" iff `x mod p` matches the sent
//!   remainder, the decoded parity matches `popcount(x) mod 2^k`, and the low
//!   bit (when sent) matches `x mod 2`.
//! - The **adversary** hands Alice `y` from [`crate::adversary`] and Bob
//!   `x = 0`. Every acceptance is a false positive.
//!
//! Each trial also re-decodes every coded modulus. A decoded modulus that
//! differs from the one Alice chose is a codec bug, and the run aborts.
//!
//! ## Transmission Size
//!
//! A zero remainder is sent as a single bit; otherwise the remainder costs
//! its bit length. The coded modulus costs its own bit length, and the
//! remainder-defense bit adds one more.

use anyhow::{ensure, Context, Result};
use rug::Integer;
use serde::Serialize;
use tracing::debug;

use crate::adversary::{self, AdversarialY, Strategy};
use crate::codec::{self, bit_length, EncodedFingerprint, ParityWidth};
use crate::rng::UniformSource;
use crate::sieve::PrimeSet;

/// One message from Alice to Bob.
#[derive(Debug, Clone)]
pub struct Message {
    pub fingerprint: EncodedFingerprint,
    pub remainder: Integer,
    /// `y mod 2`, present only under the remainder defense.
    pub low_bit: Option<u32>,
}

impl Message {
    /// Bits on the wire for this message.
    pub fn payload_bits(&self) -> u32 {
        let core = if self.remainder == 0 {
            1 + self.fingerprint.bit_length()
        } else {
            self.fingerprint.bit_length() + bit_length(&self.remainder)
        };
        core + u32::from(self.low_bit.is_some())
    }
}

/// Non-negative residue of `v` modulo `m` (`m > 0`).
fn residue(v: &Integer, m: &Integer) -> Integer {
    let mut r = Integer::from(v % m);
    if r < 0 {
        r += m;
    }
    r
}

/// Alice's side: fingerprint `y` under modulus `p`.
pub fn alice_send(y: &Integer, p: &Integer, width: ParityWidth, send_low_bit: bool) -> Message {
    Message {
        fingerprint: codec::encode(p, y, width),
        remainder: residue(y, p),
        low_bit: send_low_bit.then(|| u32::from(y.is_odd())),
    }
}

/// Bob's side: does `x` match the fingerprint he received?
pub fn bob_accepts(x: &Integer, msg: &Message) -> bool {
    let width = msg.fingerprint.width();
    let (p, parity) = codec::decode(&msg.fingerprint);
    if p <= 0 {
        return false;
    }
    if residue(x, &p) != msg.remainder {
        return false;
    }
    if width != ParityWidth::None && parity != width.parity_of(x) {
        return false;
    }
    match msg.low_bit {
        Some(bit) => u32::from(x.is_odd()) == bit,
        None => true,
    }
}

/// Abort unless `msg` decodes to exactly the modulus Alice chose.
pub fn check_consistency(sent: &Integer, msg: &Message) -> Result<()> {
    let (decoded, _) = codec::decode(&msg.fingerprint);
    ensure!(
        decoded == *sent,
        "decoded modulus {} does not match sent modulus {} ({}); statistics would be meaningless",
        decoded,
        sent,
        msg.fingerprint.width()
    );
    Ok(())
}

/// Outcome of one modulus draw, per parity width (ordered as [`ParityWidth::ALL`]).
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub modulus: u64,
    pub accepted: [bool; 4],
    pub payload_bits: [u32; 4],
}

/// Run one trial of the parity-coded exchange with a fixed modulus.
pub fn run_trial(y: &Integer, x: &Integer, p: u64) -> Result<TrialOutcome> {
    let modulus = Integer::from(p);
    let mut accepted = [false; 4];
    let mut payload_bits = [0u32; 4];
    for (i, width) in ParityWidth::ALL.into_iter().enumerate() {
        let msg = alice_send(y, &modulus, width, false);
        check_consistency(&modulus, &msg)?;
        accepted[i] = bob_accepts(x, &msg);
        payload_bits[i] = msg.payload_bits();
    }
    Ok(TrialOutcome {
        modulus: p,
        accepted,
        payload_bits,
    })
}

/// Running totals over the trials for one `n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintTally {
    pub trials: u64,
    pub false_positives: [u64; 4],
    pub payload_bits: [u64; 4],
}

impl FingerprintTally {
    /// Count a trial. Acceptances only count as false positives when `x != y`.
    pub fn record(&mut self, outcome: &TrialOutcome, values_differ: bool) {
        self.trials += 1;
        for i in 0..4 {
            if values_differ && outcome.accepted[i] {
                self.false_positives[i] += 1;
            }
            self.payload_bits[i] += u64::from(outcome.payload_bits[i]);
        }
    }

    pub fn widths(&self) -> Vec<WidthStats> {
        ParityWidth::ALL
            .into_iter()
            .enumerate()
            .map(|(i, width)| WidthStats {
                parity_bits: width.bits(),
                false_positive_rate: ratio(self.false_positives[i], self.trials),
                avg_payload_bits: ratio(self.payload_bits[i], self.trials),
            })
            .collect()
    }
}

/// `num / den`, or 0 when there were no trials.
pub(crate) fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WidthStats {
    pub parity_bits: u32,
    pub false_positive_rate: f64,
    pub avg_payload_bits: f64,
}

/// Fingerprinting statistics for one bit budget `n`.
#[derive(Debug, Clone, Serialize)]
pub struct FingerprintPoint {
    pub n: u64,
    pub trials: u64,
    /// Bit length of the adversarial `y`.
    pub data_bits: u32,
    pub pool_size: usize,
    pub pool_hits: usize,
    /// `pool_hits / pool_size`, what the no-parity rate converges to.
    pub expected_rate: f64,
    pub widths: Vec<WidthStats>,
}

/// Adversarial run for budget `n`: greedy `y`, Bob holds `x = 0`.
pub fn simulate(
    oracle: &PrimeSet,
    n: u64,
    trials: u64,
    rng: &mut dyn UniformSource,
) -> Result<FingerprintPoint> {
    let pool = adversary::candidate_pool(oracle, n)?;
    let budget = u32::try_from(n)?;
    let adv = adversary::build(pool, budget, Strategy::Greedy);
    let x = Integer::new();
    let tally = simulate_with(&adv, &x, pool, trials, rng)
        .with_context(|| format!("fingerprint simulation aborted at n={}", n))?;
    debug!(n, trials, data_bits = adv.bit_length(), hits = adv.pool_hits(), "fingerprint point");
    Ok(FingerprintPoint {
        n,
        trials,
        data_bits: adv.bit_length(),
        pool_size: pool.len(),
        pool_hits: adv.pool_hits(),
        expected_rate: ratio(adv.pool_hits() as u64, pool.len() as u64),
        widths: tally.widths(),
    })
}

/// Draw `trials` moduli from `pool` and tally Bob's verdicts on `x`.
pub fn simulate_with(
    adv: &AdversarialY,
    x: &Integer,
    pool: &[u64],
    trials: u64,
    rng: &mut dyn UniformSource,
) -> Result<FingerprintTally> {
    let mut tally = FingerprintTally::default();
    if pool.is_empty() {
        return Ok(tally);
    }
    let differ = adv.value != *x;
    for _ in 0..trials {
        let p = pool[rng.index(pool.len())];
        let outcome = run_trial(&adv.value, x, p)?;
        tally.record(&outcome, differ);
    }
    Ok(tally)
}

/// Plain fingerprinting against the remainder defense for one `n`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RemainderPoint {
    pub n: u64,
    pub trials: u64,
    pub plain_rate: f64,
    pub defended_rate: f64,
    /// Pool primes in the greedy (undefended) `y`.
    pub plain_hits: usize,
    /// Pool primes left in the even `y` after spending one bit on the factor 2.
    pub defended_hits: usize,
}

/// Remainder-defense experiment: the same modulus draw is judged twice,
/// once against the greedy `y` without the low bit, once against the even
/// `y` with Alice also sending `y mod 2`.
pub fn simulate_remainder(
    oracle: &PrimeSet,
    n: u64,
    trials: u64,
    rng: &mut dyn UniformSource,
) -> Result<RemainderPoint> {
    let pool = adversary::candidate_pool(oracle, n)?;
    let budget = u32::try_from(n)?;
    let plain = adversary::build(pool, budget, Strategy::Greedy);
    let even = adversary::build(pool, budget, Strategy::Even);
    let x = Integer::new();

    let mut plain_fp = 0u64;
    let mut defended_fp = 0u64;
    for _ in 0..trials {
        let p = Integer::from(pool[rng.index(pool.len())]);

        let msg = alice_send(&plain.value, &p, ParityWidth::None, false);
        check_consistency(&p, &msg).with_context(|| format!("remainder simulation at n={}", n))?;
        if bob_accepts(&x, &msg) {
            plain_fp += 1;
        }

        let msg = alice_send(&even.value, &p, ParityWidth::None, true);
        check_consistency(&p, &msg).with_context(|| format!("remainder simulation at n={}", n))?;
        if bob_accepts(&x, &msg) {
            defended_fp += 1;
        }
    }

    Ok(RemainderPoint {
        n,
        trials,
        plain_rate: ratio(plain_fp, trials),
        defended_rate: ratio(defended_fp, trials),
        plain_hits: plain.pool_hits(),
        defended_hits: even.pool_hits(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ReplaySource, SeededSource};

    fn int(v: u64) -> Integer {
        Integer::from(v)
    }

    #[test]
    fn honest_equal_values_always_accepted() {
        let y = int(123_456_789);
        for p in [7u64, 101, 65_537] {
            for width in ParityWidth::ALL {
                let msg = alice_send(&y, &int(p), width, true);
                assert!(bob_accepts(&y, &msg), "p={} {}", p, width);
            }
        }
    }

    #[test]
    fn zero_remainder_fools_uncoded_bob() {
        // 17017 = 7·11·13·17; x = 0 agrees mod 13.
        let y = int(17_017);
        let msg = alice_send(&y, &int(13), ParityWidth::None, false);
        assert_eq!(msg.remainder, 0);
        assert!(bob_accepts(&Integer::new(), &msg));
    }

    #[test]
    fn parity_catches_odd_popcount() {
        // popcount(7) = 3: odd at every width, so any parity rejects x = 0.
        let y = int(7);
        for width in [ParityWidth::One, ParityWidth::Two, ParityWidth::Four] {
            let msg = alice_send(&y, &int(7), width, false);
            assert!(!bob_accepts(&Integer::new(), &msg), "{}", width);
        }
        assert!(bob_accepts(&Integer::new(), &alice_send(&y, &int(7), ParityWidth::None, false)));
    }

    #[test]
    fn parity_passes_when_popcount_is_multiple_of_width() {
        let y = int(7 * 13 * 31);
        let pc = codec::popcount(&y);
        for width in ParityWidth::ALL {
            let msg = alice_send(&y, &int(13), width, false);
            let expect = pc % width.modulus() == 0;
            assert_eq!(bob_accepts(&Integer::new(), &msg), expect, "{} popcount {}", width, pc);
        }
    }

    #[test]
    fn low_bit_rejects_odd_y_against_zero() {
        let y = int(7 * 11);
        let msg = alice_send(&y, &int(11), ParityWidth::None, true);
        assert_eq!(msg.low_bit, Some(1));
        assert!(!bob_accepts(&Integer::new(), &msg));

        let even = int(2 * 7 * 11);
        let msg = alice_send(&even, &int(11), ParityWidth::None, true);
        assert!(bob_accepts(&Integer::new(), &msg));
    }

    #[test]
    fn payload_bits_accounting() {
        // p = 13 (4 bits), remainder 0 -> 1 + 4; with 2-bit parity -> 1 + 6.
        let y = int(13 * 7);
        assert_eq!(alice_send(&y, &int(13), ParityWidth::None, false).payload_bits(), 5);
        assert_eq!(alice_send(&y, &int(13), ParityWidth::Two, false).payload_bits(), 7);
        // p = 11, 91 mod 11 = 3 (2 bits) -> 4 + 2, plus the low bit.
        assert_eq!(alice_send(&y, &int(11), ParityWidth::None, false).payload_bits(), 6);
        assert_eq!(alice_send(&y, &int(11), ParityWidth::None, true).payload_bits(), 7);
    }

    #[test]
    fn corrupted_fingerprint_is_fatal() {
        let msg = Message {
            fingerprint: EncodedFingerprint::from_raw(int(13 * 4 + 8), ParityWidth::Two),
            remainder: int(0),
            low_bit: None,
        };
        let err = check_consistency(&int(13), &msg).unwrap_err();
        assert!(err.to_string().contains("does not match sent modulus 13"), "{}", err);
        assert!(check_consistency(&int(15), &msg).is_ok());
    }

    #[test]
    fn tally_counts_only_differing_values() {
        let outcome = run_trial(&int(7), &Integer::new(), 7).unwrap();
        let mut tally = FingerprintTally::default();
        tally.record(&outcome, true);
        tally.record(&outcome, true);
        tally.record(&outcome, false);
        assert_eq!(tally.trials, 3);
        assert_eq!(tally.false_positives, [2, 0, 0, 0]);
        assert_eq!(tally.payload_bits[0], 12);
    }

    #[test]
    fn trial_outcome_covers_all_widths() {
        let outcome = run_trial(&int(7), &Integer::new(), 7).unwrap();
        assert_eq!(outcome.modulus, 7);
        assert_eq!(outcome.accepted, [true, false, false, false]);
        // 7 = 0b111: 1 + 3, then + k per width
        assert_eq!(outcome.payload_bits, [4, 5, 6, 8]);
    }

    #[test]
    fn zero_trials_yield_neutral_statistics() {
        let oracle = PrimeSet::new(100);
        let mut rng = SeededSource::new(1);
        let point = simulate(&oracle, 6, 0, &mut rng).unwrap();
        assert_eq!(point.trials, 0);
        for w in &point.widths {
            assert_eq!(w.false_positive_rate, 0.0);
            assert_eq!(w.avg_payload_bits, 0.0);
        }
        let rem = simulate_remainder(&oracle, 6, 0, &mut rng).unwrap();
        assert_eq!(rem.plain_rate, 0.0);
        assert_eq!(rem.defended_rate, 0.0);
    }

    /// n = 6: pool {7, 11, ..., 31}, y = 7, so exactly one draw in eight wins.
    #[test]
    fn n6_replayed_draws_hit_exactly_on_seven() {
        let oracle = PrimeSet::new(100);
        let mut rng = ReplaySource::new(0u32..8);
        let point = simulate(&oracle, 6, 8, &mut rng).unwrap();
        assert_eq!(point.data_bits, 3);
        assert_eq!(point.pool_size, 8);
        assert_eq!(point.pool_hits, 1);
        assert_eq!(point.widths[0].false_positive_rate, 1.0 / 8.0);
        // popcount(7) = 3 is odd: every parity width defeats the attack.
        for w in &point.widths[1..] {
            assert_eq!(w.false_positive_rate, 0.0);
        }
    }

    #[test]
    fn n6_random_rate_approximates_expected() {
        let oracle = PrimeSet::new(100);
        let mut rng = SeededSource::new(5080);
        let point = simulate(&oracle, 6, 20_000, &mut rng).unwrap();
        assert_eq!(point.expected_rate, 0.125);
        let observed = point.widths[0].false_positive_rate;
        assert!((observed - 0.125).abs() < 0.015, "observed {}", observed);
    }

    #[test]
    fn parity_never_raises_false_positive_rate() {
        let oracle = PrimeSet::new(200 * 200);
        let mut rng = SeededSource::new(9);
        for n in [10u64, 25, 60, 120, 200] {
            let point = simulate(&oracle, n, 2_000, &mut rng).unwrap();
            let none = point.widths[0].false_positive_rate;
            for w in &point.widths[1..] {
                assert!(w.false_positive_rate <= none, "n={} {:?}", n, w);
            }
        }
    }

    #[test]
    fn remainder_defense_reduces_but_keeps_attack_alive() {
        let oracle = PrimeSet::new(200 * 200);
        let mut rng = SeededSource::new(11);
        let point = simulate_remainder(&oracle, 200, 20_000, &mut rng).unwrap();
        assert!(point.defended_hits <= point.plain_hits);
        assert!(point.defended_rate > 0.0);
        assert!(point.defended_rate <= point.plain_rate + 0.01);
    }
}
