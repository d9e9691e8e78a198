//! Match-span reconstruction: aligning matching fingerprint positions
//! between a document and one source into contiguous spans.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::winnow::Fingerprint;

/// A contiguous matched region. Offsets are code points into the
/// respective normalized texts; `doc_start < doc_end` and
/// `src_start < src_end` always hold, and `score` is in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchSpan {
    pub doc_start: u32,
    pub doc_end: u32,
    pub src_start: u32,
    pub src_end: u32,
    pub score: f64,
    pub snippet_hash: String,
}

struct RawMatch {
    hash: u64,
    a_pos: u32,
    b_pos: u32,
}

/// Align `fp_doc` against `fp_src` and merge nearby matches into spans,
/// ordered by ascending `doc_start`.
///
/// Each document fingerprint whose hash occurs in the source is paired
/// with the *first* (smallest) source position recorded for that hash; a
/// dynamic-programming alignment would be tighter but is not required.
/// Matches within `k` of the current span's tail extend it, anything
/// further starts a new span.
///
/// The span score `min(1, (doc_end - doc_start) / (|fp_doc| * k))` mixes a
/// fingerprint count with a character length. The ratio is dimensionally
/// odd but is the published contract: it conveys relative span weight, not
/// Jaccard similarity.
pub fn build_spans(fp_doc: &[Fingerprint], fp_src: &[Fingerprint], k: usize) -> Vec<MatchSpan> {
    if fp_doc.is_empty() || fp_src.is_empty() || k == 0 {
        return Vec::new();
    }

    // First occurrence per hash; fp_src is position-ordered, so the first
    // insertion is the smallest position.
    let mut src_pos: HashMap<u64, u32> = HashMap::with_capacity(fp_src.len());
    for f in fp_src {
        src_pos.entry(f.hash).or_insert(f.pos);
    }

    let mut raw: Vec<RawMatch> = fp_doc
        .iter()
        .filter_map(|f| {
            src_pos.get(&f.hash).map(|&b_pos| RawMatch {
                hash: f.hash,
                a_pos: f.pos,
                b_pos,
            })
        })
        .collect();
    if raw.is_empty() {
        return Vec::new();
    }
    raw.sort_by_key(|m| m.a_pos);

    let k32 = k as u32;
    let norm = (fp_doc.len() * k) as f64;
    let mut spans = Vec::new();

    let first = &raw[0];
    let mut doc_start = first.a_pos;
    let mut doc_end = first.a_pos + k32;
    let mut src_start = first.b_pos;
    let mut src_end = first.b_pos + k32;
    let mut snippet_hash = first.hash;

    let close = |spans: &mut Vec<MatchSpan>,
                 doc_start: u32,
                 doc_end: u32,
                 src_start: u32,
                 src_end: u32,
                 snippet_hash: u64| {
        spans.push(MatchSpan {
            doc_start,
            doc_end,
            src_start,
            src_end,
            score: (f64::from(doc_end - doc_start) / norm).min(1.0),
            snippet_hash: snippet_hash.to_string(),
        });
    };

    for m in &raw[1..] {
        if u64::from(m.a_pos) <= u64::from(doc_end) + k as u64 {
            doc_end = m.a_pos + k32;
            // Source positions are not guaranteed monotone across raw
            // matches; extending with max keeps src_start < src_end.
            src_end = src_end.max(m.b_pos + k32);
        } else {
            close(&mut spans, doc_start, doc_end, src_start, src_end, snippet_hash);
            doc_start = m.a_pos;
            doc_end = m.a_pos + k32;
            src_start = m.b_pos;
            src_end = m.b_pos + k32;
            snippet_hash = m.hash;
        }
    }
    close(&mut spans, doc_start, doc_end, src_start, src_end, snippet_hash);

    spans
}
