//! Typed records for every table the pipeline touches.
//!
//! Field names follow the canonical relational column names so the encoded
//! rows map one-to-one onto the SQL schema this store stands in for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of `algoritma_params`. The history table keeps every tuple ever
/// activated; the row active at time `t` satisfies
/// `active_from <= t < active_to` (a missing `active_to` means open-ended),
/// and among several such rows the most recently activated wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlgorithmParams {
    pub id: u64,
    /// K-gram length, >= 1.
    pub k: usize,
    /// Winnowing window, >= 1.
    pub w: usize,
    /// Rolling-hash base carried for schema compatibility; the pipeline's
    /// hash family is fixed by the wire contract and does not consume it.
    pub base: u64,
    /// Jaccard threshold in [0, 1] above which match spans are persisted.
    pub threshold: f64,
    pub active_from: DateTime<Utc>,
    pub active_to: Option<DateTime<Utc>>,
}

impl AlgorithmParams {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.active_from <= now && self.active_to.map_or(true, |until| now < until)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.k == 0 {
            return Err(format!("k must be >= 1 (got {})", self.k));
        }
        if self.w == 0 {
            return Err(format!("w must be >= 1 (got {})", self.w));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(format!("threshold must be in [0, 1] (got {})", self.threshold));
        }
        Ok(())
    }
}

/// Document lifecycle status for `user_document`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Extracted,
    Ready,
}

/// One row of `user_document`. `path_text` points at the normalized text
/// file (UTF-8, LF-terminated); extraction from the raw container happens
/// upstream and is out of scope here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDocument {
    pub id: u64,
    pub owner: u64,
    pub title: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub status: DocumentStatus,
    pub path_raw: Option<String>,
    pub path_text: String,
}

/// Provenance of a corpus entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Upload,
    Url,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Upload => "upload",
            SourceType::Url => "url",
        }
    }
}

/// One row of `corpus_document`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusDocument {
    pub id: u64,
    pub title: String,
    pub source_type: SourceType,
    pub source_ref: String,
    pub path_text: String,
    pub is_active: bool,
}

/// Check request state machine: `queued -> processing -> (done | failed)`.
/// The terminal states set `finished_at` on entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Queued => "queued",
            CheckStatus::Processing => "processing",
            CheckStatus::Done => "done",
            CheckStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckStatus::Done | CheckStatus::Failed)
    }
}

/// One row of `check_request`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckRequest {
    pub id: u64,
    pub requested_by: u64,
    pub doc_id: u64,
    pub params_id: u64,
    pub status: CheckStatus,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// One row of `check_result`; immutable once written, exactly one per
/// completed check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckResultRow {
    pub id: u64,
    pub check_id: u64,
    /// Best corpus similarity as a percentage with two decimals.
    pub similarity: f64,
    pub report_path: Option<String>,
    /// JSON summary: params echo, candidate list, best similarity and any
    /// corpus warnings. Stored serialized to keep the row self-contained.
    pub summary_json: String,
    pub created_at: DateTime<Utc>,
}

/// One row of `check_match`, owned by its result row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckMatchRow {
    pub id: u64,
    pub result_id: u64,
    pub source_type: SourceType,
    pub source_id: u64,
    pub doc_span_start: u32,
    pub doc_span_end: u32,
    pub src_span_start: u32,
    pub src_span_end: u32,
    pub match_score: f64,
    pub snippet_hash: String,
}

/// Reviewer verdict over a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Wajar,
    PerluRevisi,
    Plagiarisme,
}

/// One row of `verification_note`; at most one per result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationNote {
    pub id: u64,
    pub result_id: u64,
    pub verifier_id: u64,
    pub status: VerificationStatus,
    pub note_text: String,
    pub created_at: DateTime<Utc>,
}

/// Cached MinHash signature for a corpus document under one parameter
/// tuple. Invalidated by comparing `text_sha256` against the current
/// normalized text; stale entries are simply recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedSignature {
    pub params_id: u64,
    pub corpus_id: u64,
    pub text_sha256: String,
    pub signature: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn params() -> AlgorithmParams {
        AlgorithmParams {
            id: 1,
            k: 5,
            w: 4,
            base: 257,
            threshold: 0.8,
            active_from: ts(1_000),
            active_to: None,
        }
    }

    #[test]
    fn open_ended_row_is_active_after_start() {
        let p = params();
        assert!(!p.is_active_at(ts(999)));
        assert!(p.is_active_at(ts(1_000)));
        assert!(p.is_active_at(ts(5_000_000)));
    }

    #[test]
    fn bounded_row_expires() {
        let p = AlgorithmParams {
            active_to: Some(ts(2_000)),
            ..params()
        };
        assert!(p.is_active_at(ts(1_999)));
        assert!(!p.is_active_at(ts(2_000)));
    }

    #[test]
    fn validation_rejects_bad_tuples() {
        assert!(params().validate().is_ok());
        assert!(AlgorithmParams { k: 0, ..params() }.validate().is_err());
        assert!(AlgorithmParams { w: 0, ..params() }.validate().is_err());
        assert!(AlgorithmParams {
            threshold: 1.5,
            ..params()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn status_terminality() {
        assert!(!CheckStatus::Queued.is_terminal());
        assert!(!CheckStatus::Processing.is_terminal());
        assert!(CheckStatus::Done.is_terminal());
        assert!(CheckStatus::Failed.is_terminal());
    }

    #[test]
    fn verification_status_wire_names() {
        let json = serde_json::to_string(&VerificationStatus::PerluRevisi).unwrap();
        assert_eq!(json, "\"perlu_revisi\"");
        let json = serde_json::to_string(&VerificationStatus::Wajar).unwrap();
        assert_eq!(json, "\"wajar\"");
    }

    #[test]
    fn source_type_wire_names() {
        assert_eq!(SourceType::Upload.as_str(), "upload");
        assert_eq!(serde_json::to_string(&SourceType::Url).unwrap(), "\"url\"");
    }
}
