use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;

use fingerprint::{
    bucket_keys, build_spans, jaccard, minhash_estimate, signature, winnow, MatchSpan,
};
use normalize::{normalize, NormalizedText};
use store::{
    AlgorithmParams, CachedSignature, CheckMatchRow, CheckRequest, CorpusDocument,
    read_normalized_text, Store, UserDocument,
};

use crate::metrics::metrics_recorder;
use crate::types::{
    CandidateSummary, CheckError, CheckJob, CheckOutcome, CheckSummary, CheckerConfig,
    CorpusWarning, SummaryParams,
};

/// Trait for a check orchestrator.
pub trait CheckRunner: Send + Sync {
    /// Run a single check to a terminal state and return its outcome.
    fn run_check(&self, job: &CheckJob) -> Result<CheckOutcome, CheckError>;
}

/// The production orchestrator: wires the fingerprint pipeline against the
/// store and drives one check request from `queued` to `done` or `failed`.
///
/// The active parameter row and the corpus membership are read once at the
/// start of a check and treated as an immutable snapshot; the single
/// atomic write at the end covers the result and match rows plus the
/// terminal `done` transition.
pub struct DefaultChecker {
    store: Arc<Store>,
    cfg: CheckerConfig,
}

/// Per-corpus-document outcome of the LSH pruning scan.
enum ScanOutcome {
    /// No shared bucket; never scored.
    Pruned,
    /// Text unreadable or otherwise unusable; skipped with a warning.
    Skipped(CorpusWarning),
    Candidate(Candidate),
}

/// A corpus document that survived pruning, with its normalized text kept
/// for the exact-similarity phase so the file is read only once.
struct Candidate {
    doc: CorpusDocument,
    approx: f64,
    text: NormalizedText,
}

impl DefaultChecker {
    pub fn new(store: Arc<Store>, cfg: CheckerConfig) -> Self {
        Self { store, cfg }
    }

    pub fn with_defaults(store: Arc<Store>) -> Self {
        Self::new(store, CheckerConfig::default())
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    fn check_deadline(&self, started: Instant) -> Result<(), CheckError> {
        let elapsed = started.elapsed();
        if elapsed > self.cfg.deadline {
            return Err(CheckError::Deadline {
                elapsed_ms: elapsed.as_millis(),
            });
        }
        Ok(())
    }

    fn check_cancelled(&self, job: &CheckJob) -> Result<(), CheckError> {
        if let Some(flag) = job.cancel.as_ref() {
            if flag.load(Ordering::Relaxed) {
                return Err(CheckError::Cancelled);
            }
        }
        Ok(())
    }

    /// Signature of one corpus document, via the persisted cache when the
    /// stored checksum still matches the current text. Cache writes are
    /// best-effort; a failed write only costs a recomputation later.
    fn corpus_signature(
        &self,
        params: &AlgorithmParams,
        doc: &CorpusDocument,
        text: &NormalizedText,
    ) -> Vec<u64> {
        if self.cfg.use_signature_cache {
            match self.store.cached_signature(params.id, doc.id) {
                Ok(Some(entry))
                    if entry.text_sha256 == text.sha256_hex()
                        && entry.signature.len() == self.cfg.num_perm =>
                {
                    return entry.signature;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(corpus_id = doc.id, error = %err, "signature cache read failed");
                }
            }
        }

        let sig = signature(text.as_str(), params.k, self.cfg.num_perm);

        if self.cfg.use_signature_cache {
            let entry = CachedSignature {
                params_id: params.id,
                corpus_id: doc.id,
                text_sha256: text.sha256_hex().to_string(),
                signature: sig.clone(),
            };
            if let Err(err) = self.store.store_cached_signature(&entry) {
                tracing::warn!(corpus_id = doc.id, error = %err, "signature cache write failed");
            }
        }

        sig
    }

    /// LSH pruning for one corpus document. Read failures are recovered
    /// here: the entry is skipped and the check continues.
    fn scan_corpus_doc(
        &self,
        params: &AlgorithmParams,
        sig_doc: &[u64],
        buckets_doc: &HashSet<String>,
        doc: CorpusDocument,
    ) -> ScanOutcome {
        let raw = match read_normalized_text(&doc.path_text) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(corpus_id = doc.id, error = %err, "skipping unreadable corpus text");
                return ScanOutcome::Skipped(CorpusWarning {
                    id_corpus: doc.id,
                    message: err.to_string(),
                });
            }
        };
        // Idempotent re-normalization pins the offset domain even if the
        // stored file was produced by an older normalizer.
        let text = normalize(&raw);

        let sig = self.corpus_signature(params, &doc, &text);
        let shares_bucket = bucket_keys(&sig, self.cfg.bands)
            .iter()
            .any(|key| buckets_doc.contains(key));
        if !shares_bucket {
            return ScanOutcome::Pruned;
        }

        let approx = minhash_estimate(sig_doc, &sig);
        ScanOutcome::Candidate(Candidate { doc, approx, text })
    }

    /// The pipeline proper, after the request row exists. Any error from
    /// here moves the request to `failed` in the caller.
    fn execute(
        &self,
        check: &CheckRequest,
        doc: &UserDocument,
        params: &AlgorithmParams,
        job: &CheckJob,
        started: Instant,
    ) -> Result<CheckOutcome, CheckError> {
        let text_doc = normalize(&read_normalized_text(&doc.path_text)?);
        if text_doc.char_len() < params.k {
            return Err(CheckError::EmptyOrTooShort {
                len: text_doc.char_len(),
                k: params.k,
            });
        }

        let sig_doc = signature(text_doc.as_str(), params.k, self.cfg.num_perm);
        let buckets_doc: HashSet<String> =
            bucket_keys(&sig_doc, self.cfg.bands).into_iter().collect();

        // Corpus snapshot: read once, never re-read mid-check.
        let corpus = self.store.active_corpus()?;
        self.check_deadline(started)?;
        self.check_cancelled(job)?;

        let outcomes: Vec<ScanOutcome> = if self.cfg.parallel_scan {
            corpus
                .into_par_iter()
                .map(|c| self.scan_corpus_doc(params, &sig_doc, &buckets_doc, c))
                .collect()
        } else {
            let mut out = Vec::new();
            for c in corpus {
                self.check_deadline(started)?;
                self.check_cancelled(job)?;
                out.push(self.scan_corpus_doc(params, &sig_doc, &buckets_doc, c));
            }
            out
        };

        let mut warnings = Vec::new();
        let mut candidates = Vec::new();
        for outcome in outcomes {
            match outcome {
                ScanOutcome::Pruned => {}
                ScanOutcome::Skipped(warning) => warnings.push(warning),
                ScanOutcome::Candidate(candidate) => candidates.push(candidate),
            }
        }
        warnings.sort_by_key(|w| w.id_corpus);

        // Deterministic candidate order: approx descending, corpus id
        // ascending on ties.
        candidates.sort_by(|a, b| {
            b.approx
                .partial_cmp(&a.approx)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.doc.id.cmp(&b.doc.id))
        });
        let cap = job
            .max_candidates
            .unwrap_or(self.cfg.candidate_cap)
            .min(self.cfg.candidate_cap);
        candidates.truncate(cap);

        let fp_doc = winnow(text_doc.as_str(), params.k, params.w);

        let mut best_sim = 0.0_f64;
        let mut match_rows: Vec<CheckMatchRow> = Vec::new();
        for candidate in &candidates {
            self.check_deadline(started)?;
            self.check_cancelled(job)?;

            let fp_c = winnow(candidate.text.as_str(), params.k, params.w);
            let sim = jaccard(&fp_doc, &fp_c);
            if sim > best_sim {
                best_sim = sim;
            }
            if sim >= params.threshold {
                let mut spans = build_spans(&fp_doc, &fp_c, params.k);
                spans.truncate(self.cfg.span_cap);
                for span in spans {
                    match_rows.push(to_match_row(&candidate.doc, span));
                }
            }
        }

        self.check_cancelled(job)?;

        let similarity = (best_sim * 10_000.0).round() / 100.0;
        let summary = CheckSummary {
            params: SummaryParams {
                id_params: params.id,
                k: params.k,
                w: params.w,
                threshold: params.threshold,
            },
            candidates: candidates
                .iter()
                .map(|c| CandidateSummary {
                    id_corpus: c.doc.id,
                    title: c.doc.title.clone(),
                    approx: c.approx,
                })
                .collect(),
            best_similarity: best_sim,
            warnings,
        };
        let summary_json = serde_json::to_string(&summary)
            .map_err(|err| CheckError::Persistence(store::StoreError::backend(err)))?;

        let candidates_count = candidates.len();
        let (result, matches_inserted) =
            self.store
                .commit_result(check.id, similarity, summary_json, match_rows, Utc::now())?;

        Ok(CheckOutcome {
            check_id: check.id,
            result_id: result.id,
            similarity,
            threshold: params.threshold,
            candidates_count,
            matches_inserted,
        })
    }
}

fn to_match_row(source: &CorpusDocument, span: MatchSpan) -> CheckMatchRow {
    CheckMatchRow {
        // Row ids are assigned by the store at commit time.
        id: 0,
        result_id: 0,
        source_type: source.source_type,
        source_id: source.id,
        doc_span_start: span.doc_start,
        doc_span_end: span.doc_end,
        src_span_start: span.src_start,
        src_span_end: span.src_end,
        match_score: span.score,
        snippet_hash: span.snippet_hash,
    }
}

impl CheckRunner for DefaultChecker {
    fn run_check(&self, job: &CheckJob) -> Result<CheckOutcome, CheckError> {
        let started = Instant::now();

        if job.doc_id == 0 {
            return Err(CheckError::InvalidInput(
                "doc id must be positive".to_string(),
            ));
        }
        let doc = self
            .store
            .get_user_document(job.doc_id)?
            .ok_or_else(|| CheckError::InvalidInput(format!("unknown document {}", job.doc_id)))?;
        if doc.owner != job.requested_by {
            return Err(CheckError::InvalidInput(format!(
                "document {} is not owned by caller {}",
                job.doc_id, job.requested_by
            )));
        }

        let params = self
            .store
            .active_params(Utc::now())?
            .ok_or(CheckError::NoActiveParams)?;

        let check = self
            .store
            .create_check_request(job.requested_by, job.doc_id, params.id, Utc::now())?;
        let check = self.store.mark_processing(check.id, Utc::now())?;
        tracing::info!(
            event = "CREATE_CHECK_REQUEST",
            check_id = check.id,
            doc_id = job.doc_id,
            params_id = params.id,
            "check request created"
        );

        match self.execute(&check, &doc, &params, job, started) {
            Ok(outcome) => {
                tracing::info!(
                    event = "CHECK_COMPLETED",
                    check_id = check.id,
                    similarity = outcome.similarity,
                    candidates = outcome.candidates_count,
                    matches = outcome.matches_inserted,
                    "check completed"
                );
                if let Some(recorder) = metrics_recorder() {
                    recorder.record_check(
                        "done",
                        started.elapsed(),
                        outcome.candidates_count,
                        outcome.matches_inserted,
                    );
                }
                Ok(outcome)
            }
            Err(err) => {
                // Terminal failure: no partial result rows exist, only the
                // request row flips to failed.
                if let Err(mark_err) = self.store.mark_failed(check.id, Utc::now()) {
                    tracing::error!(
                        check_id = check.id,
                        error = %mark_err,
                        "failed to mark check as failed"
                    );
                }
                tracing::warn!(
                    event = "CHECK_COMPLETED",
                    check_id = check.id,
                    kind = err.kind(),
                    error = %err,
                    "check failed"
                );
                if let Some(recorder) = metrics_recorder() {
                    recorder.record_check(err.kind(), started.elapsed(), 0, 0);
                }
                Err(err)
            }
        }
    }
}
