//! Canonical text normalization for the simcheck pipeline.
//!
//! Responsibilities:
//! - Unicode-aware lowercasing
//! - Newline normalization (CRLF to LF)
//! - Replacing runs of non-letter/non-digit characters with a single space
//! - Collapsing whitespace runs and trimming the edges
//! - SHA-256 checksum of the normalized text
//!
//! Every downstream position (k-gram offsets, fingerprints, match spans)
//! indexes the normalized string, counted in scalar code points. Raw-text
//! highlighting therefore requires a separate re-mapping step; this crate
//! never hands out raw-text offsets.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_categories::UnicodeCategories;

/// Output of normalization: the canonical text plus derived metadata.
///
/// Normalization is idempotent: feeding `as_str()` back through
/// [`normalize`] yields an equal value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedText {
    text: String,
    char_len: usize,
    sha256_hex: String,
}

impl NormalizedText {
    /// The normalized text itself.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consume the wrapper and return the normalized string.
    pub fn into_string(self) -> String {
        self.text
    }

    /// Length in scalar code points. This is the offset domain used by
    /// every downstream position in the pipeline.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Hex-encoded SHA-256 of the normalized text bytes.
    pub fn sha256_hex(&self) -> &str {
        &self.sha256_hex
    }
}

/// Characters that survive normalization: Unicode letters (L*) and
/// numbers (N*). Everything else is a separator.
#[inline]
fn keeps(ch: char) -> bool {
    ch.is_letter() || ch.is_number()
}

/// Normalize raw text into its canonical comparable form.
///
/// Transformations, in order: lowercase, CRLF to LF, replace every maximal
/// run of non-letter/non-digit characters with one space, collapse
/// whitespace runs, trim. The first two steps are subsumed by the
/// separator-run replacement in the single pass below, but the observable
/// result is identical to applying them sequentially.
pub fn normalize(input: &str) -> NormalizedText {
    let mut text = String::with_capacity(input.len());
    let mut char_len = 0usize;
    let mut pending_space = false;

    for raw in input.chars() {
        for ch in raw.to_lowercase() {
            if keeps(ch) {
                if pending_space && !text.is_empty() {
                    text.push(' ');
                    char_len += 1;
                }
                pending_space = false;
                text.push(ch);
                char_len += 1;
            } else {
                // Any separator run, whitespace or punctuation, collapses
                // into at most one space; leading runs vanish entirely.
                pending_space = true;
            }
        }
    }

    let sha256_hex = hash_text(&text);
    NormalizedText {
        text,
        char_len,
        sha256_hex,
    }
}

/// Hex-encoded SHA-256 digest of a text, as stored alongside documents.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
