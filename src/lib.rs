//! Workspace umbrella crate for the simcheck plagiarism-detection
//! pipeline.
//!
//! The `simcheck` crate re-exports the normalization, fingerprinting,
//! store and orchestration layers so applications can drive the whole
//! pipeline through a single dependency. Two helpers cover the common
//! standalone uses:
//!
//! - [`analyze_text`] runs one text through normalize → k-grams → winnow →
//!   MinHash → LSH and returns every intermediate artifact.
//! - [`compare_texts`] scores two texts directly (exact Jaccard over
//!   winnowed fingerprints, the MinHash estimate, and the aligned match
//!   spans) without touching a store.
//!
//! Service deployments use the `checker` re-exports instead: build a
//! [`Store`], wrap it in a [`DefaultChecker`] and call
//! [`CheckRunner::run_check`] per request. Everything is deterministic:
//! the same inputs produce identical signatures, bucket keys and spans on
//! every run and every machine.

pub use checker::{
    set_check_metrics, CandidateSummary, CheckError, CheckJob, CheckMetrics, CheckOutcome,
    CheckRunner, CheckSummary, CheckerConfig, CorpusWarning, DefaultChecker, SummaryParams,
};
pub use fingerprint::{
    bucket_keys, build_spans, h64, hashed_kgrams, jaccard, kgram_residues, kgrams,
    minhash_estimate, residue, sha1_hex, signature, signature_from_set, winnow, Fingerprint,
    FingerprintConfig, FingerprintError, HashedGram, KGram, MatchSpan, MERSENNE_PRIME,
};
pub use normalize::{hash_text, normalize, NormalizedText};
pub use store::{
    read_normalized_text, AlgorithmParams, BackendConfig, CachedSignature, CheckMatchRow,
    CheckRequest, CheckResultRow, CheckStatus, CorpusDocument, DocumentStatus, InMemoryBackend,
    RedbBackend, SourceType, Store, StoreBackend, StoreConfig, StoreError, UserDocument,
    VerificationNote, VerificationStatus,
};

pub mod config;

/// Every artifact the pipeline derives from a single text.
#[derive(Debug, Clone)]
pub struct TextAnalysis {
    pub normalized: NormalizedText,
    pub fingerprints: Vec<Fingerprint>,
    pub signature: Vec<u64>,
    pub buckets: Vec<String>,
}

/// Run one text through the full fingerprinting pipeline.
pub fn analyze_text(
    input: &str,
    cfg: &FingerprintConfig,
) -> Result<TextAnalysis, FingerprintError> {
    cfg.validate()?;
    let normalized = normalize(input);
    let fingerprints = winnow(normalized.as_str(), cfg.k, cfg.w);
    let signature = signature(normalized.as_str(), cfg.k, cfg.num_perm);
    let buckets = bucket_keys(&signature, cfg.bands);
    Ok(TextAnalysis {
        normalized,
        fingerprints,
        signature,
        buckets,
    })
}

/// Pairwise similarity of two texts.
#[derive(Debug, Clone)]
pub struct TextComparison {
    /// Exact Jaccard over the winnowed fingerprint hash sets.
    pub jaccard: f64,
    /// MinHash collision-rate approximation of the k-gram Jaccard.
    pub minhash_estimate: f64,
    /// Aligned match spans, ascending by document offset.
    pub spans: Vec<MatchSpan>,
}

/// Compare two texts directly, without a corpus store.
pub fn compare_texts(
    doc: &str,
    source: &str,
    cfg: &FingerprintConfig,
) -> Result<TextComparison, FingerprintError> {
    let doc = analyze_text(doc, cfg)?;
    let source = analyze_text(source, cfg)?;
    Ok(TextComparison {
        jaccard: jaccard(&doc.fingerprints, &source.fingerprints),
        minhash_estimate: minhash_estimate(&doc.signature, &source.signature),
        spans: build_spans(&doc.fingerprints, &source.fingerprints, cfg.k),
    })
}
