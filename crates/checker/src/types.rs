//! Request, outcome and error types for the check orchestrator.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use store::StoreError;

/// Orchestrator tuning. `num_perm` and `bands` are the wire-contract
/// defaults; the caps bound the candidate list and the persisted spans per
/// source.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// MinHash signature length (default 100).
    pub num_perm: usize,
    /// LSH band count (default 20).
    pub bands: usize,
    /// Hard upper bound on candidates, regardless of the request (50).
    pub candidate_cap: usize,
    /// Persisted spans per matched source (50).
    pub span_cap: usize,
    /// Soft per-check deadline; on expiry the request fails.
    pub deadline: Duration,
    /// Fan the corpus scan out over a thread pool. Candidate ordering is
    /// re-sorted afterwards, so results are identical either way.
    pub parallel_scan: bool,
    /// Reuse corpus signatures persisted by earlier checks.
    pub use_signature_cache: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            num_perm: 100,
            bands: 20,
            candidate_cap: 50,
            span_cap: 50,
            deadline: Duration::from_secs(60),
            parallel_scan: false,
            use_signature_cache: true,
        }
    }
}

/// A single check request as handed to the orchestrator. `requested_by`
/// comes from the (external) authenticated surface; the orchestrator only
/// verifies document ownership against it.
#[derive(Debug, Clone, Default)]
pub struct CheckJob {
    pub doc_id: u64,
    pub requested_by: u64,
    /// Optional cap below the configured candidate limit.
    pub max_candidates: Option<usize>,
    /// Cooperative cancellation flag; observed at suspension points, never
    /// mid-hash. A cancelled check rolls back and ends `failed`.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// What the orchestrator hands back for a completed check. Mirrors the
/// `POST /api/checks` response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckOutcome {
    pub check_id: u64,
    pub result_id: u64,
    /// Best corpus similarity as a percentage with two decimals.
    pub similarity: f64,
    pub threshold: f64,
    pub candidates_count: usize,
    pub matches_inserted: usize,
}

/// Echo of the parameter tuple inside `summary_json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryParams {
    pub id_params: u64,
    pub k: usize,
    pub w: usize,
    pub threshold: f64,
}

/// One pruned-in corpus candidate inside `summary_json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateSummary {
    pub id_corpus: u64,
    pub title: String,
    pub approx: f64,
}

/// Structured warning for a corpus entry that was skipped mid-check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusWarning {
    pub id_corpus: u64,
    pub message: String,
}

/// The `summary_json` payload persisted with every result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckSummary {
    pub params: SummaryParams,
    pub candidates: Vec<CandidateSummary>,
    pub best_similarity: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CorpusWarning>,
}

/// Errors a check can end with. Unreadable corpus entries are NOT here:
/// they are recovered locally (skip plus summary warning) and never abort
/// the check.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Document id missing, non-positive, or not owned by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No `algoritma_params` row is active right now.
    #[error("no active algorithm parameters")]
    NoActiveParams,

    /// Normalized document text shorter than k.
    #[error("document text too short: {len} chars, need at least k={k}")]
    EmptyOrTooShort { len: usize, k: usize },

    /// Store failure; the whole check fails, no partial rows survive.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Soft per-check deadline exceeded.
    #[error("check deadline exceeded after {elapsed_ms} ms")]
    Deadline { elapsed_ms: u128 },

    /// Cancelled before commit; the request row ends `failed`.
    #[error("check cancelled before commit")]
    Cancelled,
}

impl CheckError {
    /// Stable kind string surfaced to API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckError::InvalidInput(_) => "INVALID_INPUT",
            CheckError::NoActiveParams => "NO_ACTIVE_PARAMS",
            CheckError::EmptyOrTooShort { .. } => "EMPTY_OR_TOO_SHORT",
            CheckError::Persistence(_) => "PERSISTENCE",
            CheckError::Deadline { .. } => "DEADLINE",
            CheckError::Cancelled => "CANCELLED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_wire_defaults() {
        let cfg = CheckerConfig::default();
        assert_eq!(cfg.num_perm, 100);
        assert_eq!(cfg.bands, 20);
        assert_eq!(cfg.candidate_cap, 50);
        assert_eq!(cfg.span_cap, 50);
        assert_eq!(cfg.deadline, Duration::from_secs(60));
        assert!(!cfg.parallel_scan);
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(CheckError::InvalidInput("x".into()).kind(), "INVALID_INPUT");
        assert_eq!(CheckError::NoActiveParams.kind(), "NO_ACTIVE_PARAMS");
        assert_eq!(
            CheckError::EmptyOrTooShort { len: 2, k: 5 }.kind(),
            "EMPTY_OR_TOO_SHORT"
        );
        assert_eq!(CheckError::Deadline { elapsed_ms: 1 }.kind(), "DEADLINE");
        assert_eq!(CheckError::Cancelled.kind(), "CANCELLED");
    }

    #[test]
    fn summary_serializes_to_wire_shape() {
        let summary = CheckSummary {
            params: SummaryParams {
                id_params: 3,
                k: 5,
                w: 4,
                threshold: 0.8,
            },
            candidates: vec![CandidateSummary {
                id_corpus: 11,
                title: "reference".to_string(),
                approx: 0.91,
            }],
            best_similarity: 0.87,
            warnings: Vec::new(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["params"]["id_params"], 3);
        assert_eq!(json["candidates"][0]["id_corpus"], 11);
        assert_eq!(json["best_similarity"], 0.87);
        // Empty warnings stay off the wire.
        assert!(json.get("warnings").is_none());
    }
}
