//! Experiments on two randomized equality/primality checks: how often the
//! Miller–Rabin test is fooled by composites, and how often an adversary can
//! make a prime-modulus fingerprint collide, with and without parity bits.

pub mod adversary;
pub mod codec;
pub mod config;
pub mod harness;
pub mod miller_rabin;
pub mod protocol;
pub mod rng;
pub mod sieve;
pub mod sweep;
