//! Deterministic textual fingerprinting: k-grams, Winnowing, MinHash and
//! banded LSH over normalized text.
//!
//! Everything in this crate is a pure function of its inputs. No process
//! seeds, no clocks: two independent runs on two machines produce
//! byte-identical signatures and bucket keys, which is what lets the
//! persisted corpus artifacts be compared against freshly computed ones.
//!
//! Positions throughout are offsets into the *normalized* text, counted in
//! scalar code points (see the `normalize` crate).

pub mod hash;
pub mod kgram;
pub mod lsh;
pub mod minhash;
pub mod similarity;
pub mod span;
pub mod winnow;

pub use hash::{h64, residue, sha1_hex, MERSENNE_PRIME};
pub use kgram::{hashed_kgrams, kgram_residues, kgrams, HashedGram, KGram};
pub use lsh::bucket_keys;
pub use minhash::{signature, signature_from_set};
pub use similarity::{jaccard, minhash_estimate};
pub use span::{build_spans, MatchSpan};
pub use winnow::{winnow, winnow_hashed, Fingerprint};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunable parameters shared by the fingerprinting stages.
///
/// `k` and `w` come from the active algorithm parameters; `num_perm` and
/// `bands` default to the values baked into the wire contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintConfig {
    /// K-gram length in code points (default 5).
    #[serde(default = "FingerprintConfig::default_k")]
    pub k: usize,
    /// Winnowing window size (default 4).
    #[serde(default = "FingerprintConfig::default_w")]
    pub w: usize,
    /// MinHash signature length (default 100).
    #[serde(default = "FingerprintConfig::default_num_perm")]
    pub num_perm: usize,
    /// LSH band count (default 20).
    #[serde(default = "FingerprintConfig::default_bands")]
    pub bands: usize,
}

impl FingerprintConfig {
    pub(crate) fn default_k() -> usize {
        5
    }

    pub(crate) fn default_w() -> usize {
        4
    }

    pub(crate) fn default_num_perm() -> usize {
        100
    }

    pub(crate) fn default_bands() -> usize {
        20
    }

    pub fn validate(&self) -> Result<(), FingerprintError> {
        if self.k == 0 {
            return Err(FingerprintError::InvalidK { k: self.k });
        }
        if self.w == 0 {
            return Err(FingerprintError::InvalidWindow { w: self.w });
        }
        if self.num_perm == 0 {
            return Err(FingerprintError::InvalidNumPerm {
                num_perm: self.num_perm,
            });
        }
        Ok(())
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            k: Self::default_k(),
            w: Self::default_w(),
            num_perm: Self::default_num_perm(),
            bands: Self::default_bands(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("invalid config: k must be >= 1 (got {k})")]
    InvalidK { k: usize },

    #[error("invalid config: w must be >= 1 (got {w})")]
    InvalidWindow { w: usize },

    #[error("invalid config: num_perm must be >= 1 (got {num_perm})")]
    InvalidNumPerm { num_perm: usize },
}
