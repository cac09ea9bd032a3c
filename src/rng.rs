//! # Randomness — Injectable Uniform Integer Sources
//!
//! Every place that needs randomness (default Miller–Rabin bases, Alice's
//! per-trial modulus) takes a `&mut dyn UniformSource` instead of reaching
//! for an ambient generator, so a run can be replayed exactly.
//!
//! - [`SeededSource`] wraps GMP's Mersenne Twister (`rug::rand::RandState`).
//! - [`ReplaySource`] cycles through a fixed list, for tests that need to pin
//!   the exact witness or modulus sequence.

use rug::rand::RandState;
use rug::Integer;

/// Generator of uniform integers over inclusive ranges.
pub trait UniformSource {
    /// Uniform integer in `[lo, hi]`. Returns `lo` when `hi < lo`.
    fn uniform(&mut self, lo: &Integer, hi: &Integer) -> Integer;

    /// Uniform index in `[0, len)`. Returns 0 when `len == 0`.
    fn index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        let hi = Integer::from(len - 1);
        self.uniform(&Integer::new(), &hi).to_usize().unwrap_or(0)
    }
}

/// Deterministic pseudo-random source seeded from a `u64`.
pub struct SeededSource {
    state: RandState<'static>,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        let mut state = RandState::new();
        state.seed(&Integer::from(seed));
        SeededSource { state }
    }

    /// Independent stream for one worker of a parallel sweep. The same
    /// `(seed, stream)` pair always yields the same sequence.
    pub fn derive(seed: u64, stream: u64) -> Self {
        let mixed = seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .rotate_left(17)
            ^ stream.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        Self::new(mixed)
    }
}

impl UniformSource for SeededSource {
    fn uniform(&mut self, lo: &Integer, hi: &Integer) -> Integer {
        if hi <= lo {
            return lo.clone();
        }
        let span = Integer::from(hi - lo) + 1u32;
        let offset = Integer::from(span.random_below_ref(&mut self.state));
        offset + lo
    }
}

/// Replays a fixed sequence of values, wrapping around at the end.
///
/// Values outside the requested range are folded into it modulo the span,
/// so a replayed sequence never violates the `[lo, hi]` contract.
pub struct ReplaySource {
    values: Vec<Integer>,
    cursor: usize,
}

impl ReplaySource {
    pub fn new<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Integer>,
    {
        ReplaySource {
            values: values.into_iter().map(Into::into).collect(),
            cursor: 0,
        }
    }

    /// Number of values handed out so far.
    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl UniformSource for ReplaySource {
    fn uniform(&mut self, lo: &Integer, hi: &Integer) -> Integer {
        if self.values.is_empty() || hi <= lo {
            return lo.clone();
        }
        let v = &self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        if v >= lo && v <= hi {
            return v.clone();
        }
        let span = Integer::from(hi - lo) + 1u32;
        let mut folded = Integer::from(v - lo) % &span;
        if folded < 0 {
            folded += &span;
        }
        folded + lo
    }
}
