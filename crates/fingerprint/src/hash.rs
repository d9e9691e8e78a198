//! Deterministic hashing primitives shared by the fingerprinting stages.
//!
//! SHA-1 is the wire-format hash: its hex output is embedded in LSH bucket
//! keys and its leading bytes form the 64-bit k-gram hash, so signatures
//! and bucket keys collide between independent implementations. Speed is
//! not the constraint here; k-grams are short and their count is bounded
//! by the document length.

use sha1::{Digest, Sha1};

/// The Mersenne prime 2^61 - 1, the modulus of the MinHash permutation
/// family. Residues live in [0, MERSENNE_PRIME); the value itself is the
/// empty-input sentinel in signatures.
pub const MERSENNE_PRIME: u64 = (1 << 61) - 1;

/// 64-bit hash of a byte string: the first 8 bytes of its SHA-1 digest,
/// interpreted big-endian.
pub fn h64(bytes: &[u8]) -> u64 {
    let digest = Sha1::digest(bytes);
    u64::from_be_bytes(digest[..8].try_into().expect("sha1 digest >= 8 bytes"))
}

/// Reduce a 64-bit hash to a residue in [0, MERSENNE_PRIME). Used only to
/// feed the MinHash permutation family.
#[inline]
pub fn residue(hash: u64) -> u64 {
    hash % MERSENNE_PRIME
}

/// Hex-encoded SHA-1 digest, as embedded in LSH bucket keys.
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}
