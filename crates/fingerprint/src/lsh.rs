//! Banded LSH over MinHash signatures.
//!
//! The signature is partitioned into `bands` slices of `r = floor(N /
//! bands)` entries each; when `N` is not divisible by `bands` the trailing
//! remainder is silently dropped. Each band serializes to decimal strings
//! joined by `-` and hashes to a bucket key of the form
//! `"<band>:<sha1-hex>"`. Two documents are LSH candidates when they share
//! at least one key.

use crate::hash::sha1_hex;

/// Bucket keys for a signature. Empty when the signature is shorter than
/// the band count (`r == 0`).
pub fn bucket_keys(sig: &[u64], bands: usize) -> Vec<String> {
    if bands == 0 {
        return Vec::new();
    }
    let r = sig.len() / bands;
    if r == 0 {
        return Vec::new();
    }

    let mut keys = Vec::with_capacity(bands);
    for b in 0..bands {
        let slice = &sig[b * r..(b + 1) * r];
        let joined = slice
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("-");
        let payload = format!("{b}:{joined}");
        keys.push(format!("{b}:{}", sha1_hex(payload.as_bytes())));
    }
    keys
}
