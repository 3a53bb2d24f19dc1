//! Seeded string hashing.
//!
//! FNV-1a (32-bit) is the only source of symmetry-breaking variation in the engine: every
//! "random-looking" angle, radius or jitter is derived from node/community ids so that identical
//! inputs always produce identical layouts.

use std::f64::consts::TAU;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

pub fn fnv1a(input: &str) -> u32 {
    fnv1a_parts(&[input])
}

/// Hashes `parts` as if they were joined with a `|` separator, without allocating.
pub fn fnv1a_parts(parts: &[&str]) -> u32 {
    let mut h = FNV_OFFSET_BASIS;
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            h ^= u32::from(b'|');
            h = h.wrapping_mul(FNV_PRIME);
        }
        for b in part.bytes() {
            h ^= u32::from(b);
            h = h.wrapping_mul(FNV_PRIME);
        }
    }
    h
}

/// Maps `key` salted with `salt` into `[0, 1]`.
pub fn unit(key: &str, salt: &str) -> f64 {
    f64::from(fnv1a_parts(&[salt, key])) / f64::from(u32::MAX)
}

/// Maps `key` salted with `salt` into `[-1, 1]`.
pub fn signed(key: &str, salt: &str) -> f64 {
    unit(key, salt) * 2.0 - 1.0
}

/// Maps `key` salted with `salt` into an angle in `[0, 2π]`.
pub fn angle(key: &str, salt: &str) -> f64 {
    unit(key, salt) * TAU
}

/// Continues an FNV-1a state over the little-endian bytes of `round`.
///
/// Lets hot loops derive per-iteration values from a per-node base hash without formatting.
pub fn remix(h: u32, round: u32) -> u32 {
    let mut h = h;
    for b in round.to_le_bytes() {
        h ^= u32::from(b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Maps a hash into `[-1, 1]`.
pub fn signed_of(h: u32) -> f64 {
    f64::from(h) / f64::from(u32::MAX) * 2.0 - 1.0
}
