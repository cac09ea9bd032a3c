//! # Codec — Parity-Augmented Fingerprint Encoding
//!
//! Alice can append k ∈ {0, 1, 2, 4} parity bits to the modulus she sends.
//! The bits are `popcount(y) mod 2^k`, where `y` is the secret being
//! fingerprinted, not the modulus itself. Bob strips them off again and
//! compares against the parity of his own value.
//!
//! ```text
//! encoded = p · 2^k + (popcount(y) mod 2^k)
//! decode  = (encoded >> k, encoded mod 2^k)
//! ```
//!
//! k = 0 is the uncoded fingerprint: the modulus passes through unchanged and
//! the parity is always 0.

use anyhow::{bail, Result};
use rug::Integer;
use serde::{Deserialize, Serialize};

/// Number of parity bits appended to a fingerprint modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ParityWidth {
    None,
    One,
    Two,
    Four,
}

impl ParityWidth {
    pub const ALL: [ParityWidth; 4] = [
        ParityWidth::None,
        ParityWidth::One,
        ParityWidth::Two,
        ParityWidth::Four,
    ];

    pub fn bits(self) -> u32 {
        match self {
            ParityWidth::None => 0,
            ParityWidth::One => 1,
            ParityWidth::Two => 2,
            ParityWidth::Four => 4,
        }
    }

    /// `2^k`, the modulus the parity is reduced by.
    pub fn modulus(self) -> u32 {
        1 << self.bits()
    }

    /// Parity of `y` at this width: `popcount(y) mod 2^k`.
    pub fn parity_of(self, y: &Integer) -> u32 {
        popcount(y) % self.modulus()
    }
}

impl TryFrom<u32> for ParityWidth {
    type Error = anyhow::Error;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            0 => Ok(ParityWidth::None),
            1 => Ok(ParityWidth::One),
            2 => Ok(ParityWidth::Two),
            4 => Ok(ParityWidth::Four),
            other => bail!("unsupported parity width {} (expected 0, 1, 2 or 4)", other),
        }
    }
}

impl From<ParityWidth> for u32 {
    fn from(width: ParityWidth) -> u32 {
        width.bits()
    }
}

impl std::fmt::Display for ParityWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParityWidth::None => write!(f, "no parity"),
            w => write!(f, "{}-bit parity", w.bits()),
        }
    }
}

/// A modulus with its parity bits packed into the low end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFingerprint {
    packed: Integer,
    width: ParityWidth,
}

impl EncodedFingerprint {
    /// Wrap a packed value as received, without re-deriving its parity.
    pub fn from_raw(packed: Integer, width: ParityWidth) -> Self {
        EncodedFingerprint { packed, width }
    }

    pub fn as_integer(&self) -> &Integer {
        &self.packed
    }

    pub fn width(&self) -> ParityWidth {
        self.width
    }

    /// Wire size of the packed value in bits.
    pub fn bit_length(&self) -> u32 {
        bit_length(&self.packed)
    }
}

/// Count set bits by repeatedly clearing the lowest one.
///
/// Negative inputs have no finite popcount and count as 0.
pub fn popcount(y: &Integer) -> u32 {
    if *y <= 0 {
        return 0;
    }
    let mut rest = y.clone();
    let mut count = 0;
    while rest != 0 {
        let below = Integer::from(&rest - 1u32);
        rest &= below;
        count += 1;
    }
    count
}

/// Significant bits of `v`; 0 for 0.
pub fn bit_length(v: &Integer) -> u32 {
    v.significant_bits()
}

/// Pack `value` with the `width`-bit parity of `secret_y`.
pub fn encode(value: &Integer, secret_y: &Integer, width: ParityWidth) -> EncodedFingerprint {
    let mut packed = Integer::from(value << width.bits());
    packed += width.parity_of(secret_y);
    EncodedFingerprint { packed, width }
}

/// Split a packed fingerprint back into `(value, parity)`.
pub fn decode(encoded: &EncodedFingerprint) -> (Integer, u32) {
    decode_raw(encoded.as_integer(), encoded.width())
}

/// Split a raw packed integer at `width`, for payloads received off the wire.
pub fn decode_raw(packed: &Integer, width: ParityWidth) -> (Integer, u32) {
    let k = width.bits();
    let value = Integer::from(packed >> k);
    let parity = Integer::from(packed.keep_bits_ref(k)).to_u32().unwrap_or(0);
    (value, parity)
}
