//! Fixed-length MinHash signatures over the distinct k-gram residue set.
//!
//! The permutation family is a universal-hashing construction in the field
//! of the Mersenne prime 2^61 - 1 with FIXED coefficients: they are part of
//! the wire contract, so signatures collide between independent
//! implementations. Products are computed in 128 bits because `a * x` with
//! x < 2^61 overflows 64-bit arithmetic.

use std::collections::BTreeSet;

use crate::hash::MERSENNE_PRIME;
use crate::kgram::kgram_residues;

/// Multiplier stride for the `a` coefficients (a prime).
const COEFF_A_STRIDE: u64 = 7_919;
/// Multiplier stride for the `b` coefficients (a prime).
const COEFF_B_STRIDE: u64 = 104_729;
/// Both coefficient families are taken modulo this bound, then offset by
/// one so every multiplier is non-zero.
const COEFF_SPAN: u64 = 100_000;

#[inline]
fn coeff_a(i: usize) -> u64 {
    1 + (i as u64 * COEFF_A_STRIDE) % COEFF_SPAN
}

#[inline]
fn coeff_b(i: usize) -> u64 {
    1 + (i as u64 * COEFF_B_STRIDE) % COEFF_SPAN
}

/// MinHash signature of `text`'s k-gram set: a vector of exactly
/// `num_perm` residues in [0, P). An input with no k-grams yields the
/// all-sentinel signature where every entry equals P itself.
pub fn signature(text: &str, k: usize, num_perm: usize) -> Vec<u64> {
    signature_from_set(&kgram_residues(text, k), num_perm)
}

/// MinHash signature of an arbitrary residue set.
pub fn signature_from_set(set: &BTreeSet<u64>, num_perm: usize) -> Vec<u64> {
    if set.is_empty() {
        return vec![MERSENNE_PRIME; num_perm];
    }

    let p = MERSENNE_PRIME as u128;
    let mut sig = Vec::with_capacity(num_perm);
    for i in 0..num_perm {
        let a = coeff_a(i) as u128;
        let b = coeff_b(i) as u128;
        let mut min = u64::MAX;
        for &x in set {
            let permuted = ((a * x as u128 + b) % p) as u64;
            if permuted < min {
                min = permuted;
            }
        }
        sig.push(min);
    }
    sig
}
