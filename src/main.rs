use std::error::Error;

use simcheck::{compare_texts, FingerprintConfig};

const DOCUMENT: &str = "Locality-sensitive hashing prunes the corpus down to a handful of \
candidates, and exact Jaccard over winnowed fingerprints confirms them. The reported spans \
come from merging adjacent fingerprint matches.";

const SOURCE: &str = "Locality-sensitive hashing prunes the corpus down to a handful of \
candidates, while a completely different closing sentence talks about something else entirely.";

fn main() -> Result<(), Box<dyn Error>> {
    let cfg = FingerprintConfig::default();
    let cmp = compare_texts(DOCUMENT, SOURCE, &cfg)?;

    println!(
        "jaccard = {:.4}, minhash estimate = {:.4}, spans = {}",
        cmp.jaccard,
        cmp.minhash_estimate,
        cmp.spans.len()
    );
    for span in &cmp.spans {
        println!(
            "  doc [{}, {}) matches source [{}, {}) score {:.3}",
            span.doc_start, span.doc_end, span.src_start, span.src_end, span.score
        );
    }

    Ok(())
}
