//! Overlapping character k-grams with source offsets.
//!
//! Offsets are scalar code points into the normalized text, matching the
//! offset domain of fingerprints and match spans. The implementation
//! slices UTF-8 byte ranges from a precomputed code-point index, so
//! non-ASCII corpora hash the exact gram bytes without re-encoding.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::hash::{h64, residue};

/// A k-gram paired with its code-point offset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KGram {
    pub gram: String,
    pub pos: u32,
}

/// A hashed k-gram: `h64` of the gram's UTF-8 bytes plus its offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashedGram {
    pub hash: u64,
    pub pos: u32,
}

/// Byte offsets of every code point in `text`, plus a trailing sentinel at
/// `text.len()`. `offsets.len() - 1` is the code-point length.
fn char_byte_offsets(text: &str) -> Vec<usize> {
    let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    offsets.push(text.len());
    offsets
}

/// Emit all `len(T) - k + 1` k-grams of `text`, or nothing when the text is
/// shorter than `k` code points.
pub fn kgrams(text: &str, k: usize) -> Vec<KGram> {
    let offsets = char_byte_offsets(text);
    let n = offsets.len() - 1;
    if k == 0 || n < k {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(n - k + 1);
    for i in 0..=n - k {
        out.push(KGram {
            gram: text[offsets[i]..offsets[i + k]].to_string(),
            pos: i as u32,
        });
    }
    out
}

/// Hashed k-gram stream: `(h64(gram_i), i)` in offset order.
pub fn hashed_kgrams(text: &str, k: usize) -> Vec<HashedGram> {
    let offsets = char_byte_offsets(text);
    let n = offsets.len() - 1;
    if k == 0 || n < k {
        return Vec::new();
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(n - k + 1);
    for i in 0..=n - k {
        out.push(HashedGram {
            hash: h64(&bytes[offsets[i]..offsets[i + k]]),
            pos: i as u32,
        });
    }
    out
}

/// The distinct k-gram hash set reduced into the MinHash field:
/// `{ hP(h64(gram)) : gram in kgrams(text, k) }`.
pub fn kgram_residues(text: &str, k: usize) -> BTreeSet<u64> {
    hashed_kgrams(text, k)
        .into_iter()
        .map(|g| residue(g.hash))
        .collect()
}
