//! # Harness — Scoring Miller–Rabin Against the Prime Oracle
//!
//! Runs the Miller–Rabin test over a range of candidates, labels each result
//! with the sieve oracle, and tabulates three views of the false positives:
//!
//! 1. **Rolling rate** — moving average over the last W candidates of the
//!    indicator "composite judged probably prime". Maintained in O(1) per
//!    step with a running sum and a bounded queue.
//! 2. **Base impact** — for each single base, the false-positive count over
//!    nested prefixes of the range (e.g. end/100, end/10, end).
//! 3. **Liar ranking** — for each composite that fooled at least one base,
//!    how many of the tested bases it fooled, and the histogram of those
//!    counts.
//!
//! True primes never count as false positives. Candidates are classified in
//! parallel blocks on the rayon pool; the rolling window then consumes the
//! indicators strictly in increasing n. Per-base scans run one base per
//! worker, each with its own counters, merged by summation.

use anyhow::{bail, ensure, Result};
use rayon::prelude::*;
use rug::Integer;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info};

use crate::miller_rabin::{self, Verdict};
use crate::sieve::PrimeSet;

/// Candidates classified per parallel block.
const BLOCK_SIZE: u64 = 1 << 16;

/// Moving average of a 0/1 indicator over the last `window` samples.
#[derive(Debug, Clone)]
pub struct RollingRate {
    window: usize,
    recent: VecDeque<u8>,
    sum: u64,
}

impl RollingRate {
    pub fn new(window: usize) -> Result<Self> {
        ensure!(window > 0, "rolling window must hold at least one sample");
        Ok(RollingRate {
            window,
            recent: VecDeque::with_capacity(window.min(1 << 20)),
            sum: 0,
        })
    }

    /// Add one sample and return the updated average.
    pub fn push(&mut self, indicator: bool) -> f64 {
        let v = u8::from(indicator);
        self.recent.push_back(v);
        self.sum += u64::from(v);
        if self.recent.len() > self.window {
            if let Some(old) = self.recent.pop_front() {
                self.sum -= u64::from(old);
            }
        }
        self.rate()
    }

    /// Average over the samples currently in the window; 0 before any sample.
    pub fn rate(&self) -> f64 {
        if self.recent.is_empty() {
            0.0
        } else {
            self.sum as f64 / self.recent.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}

fn to_integers(bases: &[u64]) -> Vec<Integer> {
    bases.iter().map(|&a| Integer::from(a)).collect()
}

fn check_range(oracle: &PrimeSet, start: u64, end: u64) -> Result<()> {
    ensure!(start <= end, "empty candidate range [{}, {}]", start, end);
    ensure!(
        oracle.covers(end),
        "candidate range ends at {} but the prime oracle stops at {}",
        end,
        oracle.limit()
    );
    Ok(())
}

/// True when `n` is composite per the oracle yet passes every base.
pub fn is_false_positive(oracle: &PrimeSet, n: u64, bases: &[Integer]) -> bool {
    if oracle.contains(n) {
        return false;
    }
    miller_rabin::is_probable_prime(&Integer::from(n), bases) == Verdict::ProbablyPrime
}

/// False-positive indicators for `[lo, hi]`, in order.
fn classify_block(oracle: &PrimeSet, lo: u64, hi: u64, bases: &[Integer]) -> Vec<bool> {
    let len = (hi - lo + 1) as usize;
    (0..len)
        .into_par_iter()
        .map(|i| is_false_positive(oracle, lo + i as u64, bases))
        .collect()
}

/// Rolling false-positive rate, one sample per candidate.
#[derive(Debug, Clone, Serialize)]
pub struct RollingSeries {
    pub bases: Vec<u64>,
    pub window: usize,
    pub n: Vec<u64>,
    pub rate: Vec<f64>,
    pub false_positives: u64,
}

pub fn rolling_false_positive_rate(
    oracle: &PrimeSet,
    start: u64,
    end: u64,
    bases: &[u64],
    window: usize,
) -> Result<RollingSeries> {
    check_range(oracle, start, end)?;
    let witnesses = to_integers(bases);
    let mut rolling = RollingRate::new(window)?;
    let total = (end - start + 1) as usize;
    let mut series = RollingSeries {
        bases: bases.to_vec(),
        window,
        n: Vec::with_capacity(total),
        rate: Vec::with_capacity(total),
        false_positives: 0,
    };
    info!(start, end, window, ?bases, "rolling false-positive sweep");

    let mut block_start = start;
    loop {
        let block_end = block_start.saturating_add(BLOCK_SIZE - 1).min(end);
        let flags = classify_block(oracle, block_start, block_end, &witnesses);
        for (offset, &fp) in flags.iter().enumerate() {
            series.n.push(block_start + offset as u64);
            series.rate.push(rolling.push(fp));
            series.false_positives += u64::from(fp);
        }
        debug!(block_start, block_end, fp = series.false_positives, "block classified");
        if block_end == end {
            break;
        }
        block_start = block_end + 1;
    }

    info!(false_positives = series.false_positives, "rolling sweep complete");
    Ok(series)
}

/// First base that appears twice in `bases`, if any.
pub fn first_duplicate(bases: &[u64]) -> Option<u64> {
    let mut seen = BTreeSet::new();
    bases.iter().copied().find(|&a| !seen.insert(a))
}

/// Default nested prefixes for the base-impact view: end/100, end/10, end.
/// Bounds below `start` are dropped.
pub fn nested_bounds(start: u64, end: u64) -> Vec<u64> {
    let mut bounds: Vec<u64> = [end / 100, end / 10, end]
        .into_iter()
        .filter(|&b| b >= start)
        .collect();
    bounds.dedup();
    bounds
}

/// False-positive counts for a single base over each nested bound.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BaseCounts {
    pub base: u64,
    /// `counts[i]` covers `[start, bounds[i]]`.
    pub counts: Vec<u64>,
}

impl BaseCounts {
    /// Count over the widest bound.
    pub fn total(&self) -> u64 {
        self.counts.last().copied().unwrap_or(0)
    }
}

/// A composite and how many of the tested bases it fooled.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Liar {
    pub n: u64,
    pub fooled: u32,
}

/// Liars over the full range plus the "how many bases at once" histogram.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LiarRanking {
    /// Sorted by `fooled` descending, then `n` ascending.
    pub liars: Vec<Liar>,
    /// `histogram[i]` = number of liars that fooled exactly `i + 1` bases.
    pub histogram: Vec<u64>,
}

impl LiarRanking {
    /// Entries with a zero count fooled nothing and are skipped.
    pub fn from_counts(counts: &BTreeMap<u64, u32>) -> Self {
        let max = counts.values().copied().max().unwrap_or(0) as usize;
        let mut histogram = vec![0u64; max];
        for &fooled in counts.values().filter(|&&f| f > 0) {
            histogram[fooled as usize - 1] += 1;
        }
        let mut liars: Vec<Liar> = counts
            .iter()
            .filter(|&(_, &fooled)| fooled > 0)
            .map(|(&n, &fooled)| Liar { n, fooled })
            .collect();
        liars.sort_by(|a, b| b.fooled.cmp(&a.fooled).then(a.n.cmp(&b.n)));
        LiarRanking { liars, histogram }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseImpact {
    pub start: u64,
    pub bounds: Vec<u64>,
    /// Sorted by full-range count descending, then base ascending.
    pub per_base: Vec<BaseCounts>,
    pub liars: LiarRanking,
}

/// One worker's scan: nested counts and the liars it saw for base `a`.
fn scan_base(oracle: &PrimeSet, start: u64, bounds: &[u64], a: u64) -> (BaseCounts, Vec<u64>) {
    let witness = [Integer::from(a)];
    let mut counts = vec![0u64; bounds.len()];
    let mut liars = Vec::new();
    let end = bounds.last().copied().unwrap_or(start);
    for n in start..=end {
        if is_false_positive(oracle, n, &witness) {
            liars.push(n);
            // Nested prefixes: n falls in every bound it does not exceed.
            for (count, &bound) in counts.iter_mut().zip(bounds) {
                if n <= bound {
                    *count += 1;
                }
            }
        }
    }
    debug!(base = a, liars = liars.len(), "base scanned");
    (BaseCounts { base: a, counts }, liars)
}

/// Single-base false-positive counts over nested ranges, plus liar ranking
/// over the widest range.
pub fn base_impact(
    oracle: &PrimeSet,
    start: u64,
    bounds: &[u64],
    bases: &[u64],
) -> Result<BaseImpact> {
    ensure!(!bases.is_empty(), "base impact needs at least one base");
    if let Some(dup) = first_duplicate(bases) {
        bail!("base {} is listed more than once; liar counts need distinct bases", dup);
    }
    ensure!(!bounds.is_empty(), "base impact needs at least one range bound");
    ensure!(
        bounds.windows(2).all(|w| w[0] <= w[1]),
        "range bounds must be ascending: {:?}",
        bounds
    );
    let end = bounds[bounds.len() - 1];
    check_range(oracle, start, end)?;
    ensure!(
        bounds[0] >= start,
        "smallest bound {} lies below start {}",
        bounds[0],
        start
    );
    info!(start, ?bounds, ?bases, "base impact sweep");

    let scans: Vec<(BaseCounts, Vec<u64>)> = bases
        .par_iter()
        .map(|&a| scan_base(oracle, start, bounds, a))
        .collect();

    let mut fooled: BTreeMap<u64, u32> = BTreeMap::new();
    let mut per_base = Vec::with_capacity(scans.len());
    for (counts, liars) in scans {
        for n in liars {
            *fooled.entry(n).or_insert(0) += 1;
        }
        per_base.push(counts);
    }
    per_base.sort_by(|a, b| b.total().cmp(&a.total()).then(a.base.cmp(&b.base)));

    Ok(BaseImpact {
        start,
        bounds: bounds.to_vec(),
        per_base,
        liars: LiarRanking::from_counts(&fooled),
    })
}
