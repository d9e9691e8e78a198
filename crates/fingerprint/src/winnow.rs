//! Winnowing fingerprint selection over the hashed k-gram stream.
//!
//! Each sliding window of `w` hashed k-grams contributes its minimum hash;
//! ties resolve to the *leftmost* position, and a pick identical to the
//! previously appended `(hash, pos)` pair is suppressed. The result is a
//! sparse, position-tagged fingerprint sequence that is a deterministic
//! function of the text and `(k, w)`.
//!
//! Implemented with a monotonic deque in O(n); this is behavior-equivalent
//! to the naive O(n*w) per-window scan.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::kgram::{hashed_kgrams, HashedGram};

/// A selected `(hash, pos)` pair. Positions index the normalized text in
/// code points and are non-decreasing within a fingerprint sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub hash: u64,
    pub pos: u32,
}

/// Winnow `text` directly: hash its k-grams, then select window minima.
pub fn winnow(text: &str, k: usize, w: usize) -> Vec<Fingerprint> {
    winnow_hashed(&hashed_kgrams(text, k), w)
}

/// Winnow an already-hashed k-gram stream with window size `max(1, w)`.
///
/// A stream shorter than the window is treated as a single window, so any
/// non-empty stream yields at least one fingerprint.
pub fn winnow_hashed(grams: &[HashedGram], w: usize) -> Vec<Fingerprint> {
    let n = grams.len();
    if n == 0 {
        return Vec::new();
    }

    let window = w.max(1);
    let span = window.min(n);
    let mut out = Vec::new();
    // Indices of window candidates in strictly increasing hash order; the
    // front is always the leftmost minimum of the current window.
    let mut dq: VecDeque<usize> = VecDeque::with_capacity(span);
    let mut last_picked: Option<usize> = None;

    let push = |dq: &mut VecDeque<usize>, i: usize, grams: &[HashedGram]| {
        // Strict comparison keeps an earlier equal hash ahead of a later
        // one, which is what makes the tie-break leftmost.
        while let Some(&j) = dq.back() {
            if grams[i].hash < grams[j].hash {
                dq.pop_back();
            } else {
                break;
            }
        }
        dq.push_back(i);
    };

    let emit = |dq: &VecDeque<usize>,
                out: &mut Vec<Fingerprint>,
                last: &mut Option<usize>,
                grams: &[HashedGram]| {
        if let Some(&idx) = dq.front() {
            // Suppress consecutive duplicates: the same (hash, pos) pick
            // from overlapping windows is recorded once.
            if *last != Some(idx) {
                out.push(Fingerprint {
                    hash: grams[idx].hash,
                    pos: grams[idx].pos,
                });
                *last = Some(idx);
            }
        }
    };

    for i in 0..span {
        push(&mut dq, i, grams);
    }
    emit(&dq, &mut out, &mut last_picked, grams);

    for i in window..n {
        let left = i - window + 1;
        while let Some(&j) = dq.front() {
            if j < left {
                dq.pop_front();
            } else {
                break;
            }
        }
        push(&mut dq, i, grams);
        emit(&dq, &mut out, &mut last_picked, grams);
    }

    out
}
