//! Persistence boundary for the simcheck pipeline.
//!
//! The orchestrator treats this crate as its only stateful collaborator:
//! it reads the active parameter snapshot and the corpus membership at the
//! start of a check, and writes the result in a single atomic commit.
//! Rows are bincode-encoded, zstd-compressed values under namespaced keys
//! whose zero-padded ids make backend key order equal id order.
//!
//! Normalized-text files live outside the row store (`path_text` columns);
//! [`read_normalized_text`] is the one place the pipeline touches them.

mod backend;
mod records;

pub use backend::{BackendConfig, InMemoryBackend, RedbBackend, StoreBackend};
pub use records::{
    AlgorithmParams, CachedSignature, CheckMatchRow, CheckRequest, CheckResultRow, CheckStatus,
    CorpusDocument, DocumentStatus, SourceType, UserDocument, VerificationNote,
    VerificationStatus,
};

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use zstd::{decode_all, encode_all};

/// Errors surfaced by the persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("row encoding error: {0}")]
    Serde(#[from] bincode::Error),

    #[error("row compression error: {0}")]
    Compression(std::io::Error),

    #[error("row not found: {key}")]
    NotFound { key: String },

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("normalized text unreadable at {path}: {source}")]
    TextFile {
        path: String,
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Store construction options.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    /// zstd level for row values; 0 falls back to the library default.
    pub compression_level: i32,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self {
            backend: BackendConfig::default(),
            compression_level: 3,
        }
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }
}

mod keys {
    pub fn params(id: u64) -> String {
        format!("params:{id:020}")
    }

    pub fn user_doc(id: u64) -> String {
        format!("user_doc:{id:020}")
    }

    pub fn corpus(id: u64) -> String {
        format!("corpus:{id:020}")
    }

    pub fn check(id: u64) -> String {
        format!("check:{id:020}")
    }

    /// One result per check, so the result row is keyed by check id.
    pub fn result(check_id: u64) -> String {
        format!("result:{check_id:020}")
    }

    pub fn match_row(result_id: u64, seq: usize) -> String {
        format!("match:{result_id:020}:{seq:06}")
    }

    pub fn match_prefix(result_id: u64) -> String {
        format!("match:{result_id:020}:")
    }

    pub fn note(result_id: u64) -> String {
        format!("note:{result_id:020}")
    }

    pub fn sig_cache(params_id: u64, corpus_id: u64) -> String {
        format!("sig_cache:{params_id:020}:{corpus_id:020}")
    }

    pub fn sequence(name: &str) -> String {
        format!("seq:{name}")
    }
}

/// Typed row store over a pluggable byte backend.
pub struct Store {
    backend: Box<dyn StoreBackend>,
    compression_level: i32,
}

impl Store {
    /// Open a store using the configured backend.
    pub fn new(cfg: StoreConfig) -> Result<Self, StoreError> {
        let backend = cfg.backend.build()?;
        Ok(Self::with_backend(cfg, backend))
    }

    /// Build a store over an explicit backend (e.g. a failing stub in
    /// tests).
    pub fn with_backend(cfg: StoreConfig, backend: Box<dyn StoreBackend>) -> Self {
        Self {
            backend,
            compression_level: cfg.compression_level,
        }
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, StoreError> {
        let raw = bincode::serialize(value)?;
        encode_all(raw.as_slice(), self.compression_level).map_err(StoreError::Compression)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, StoreError> {
        let raw = decode_all(data).map_err(StoreError::Compression)?;
        Ok(bincode::deserialize(&raw)?)
    }

    fn get_row<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.backend.get(key)? {
            Some(data) => Ok(Some(self.decode(&data)?)),
            None => Ok(None),
        }
    }

    fn put_row<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.backend.put(key, &self.encode(value)?)
    }

    fn scan_rows<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, StoreError> {
        let mut rows = Vec::new();
        self.backend.scan_prefix(prefix, &mut |_, data| {
            rows.push(data.to_vec());
            Ok(())
        })?;
        rows.iter().map(|data| self.decode(data)).collect()
    }

    /// Allocate the next id in a named sequence. Sequence bumps are
    /// independent writes, so an abandoned allocation only leaves a gap.
    fn alloc_id(&self, sequence: &str) -> Result<u64, StoreError> {
        let key = keys::sequence(sequence);
        let next = match self.backend.get(&key)? {
            Some(data) => self.decode::<u64>(&data)? + 1,
            None => 1,
        };
        self.put_row(&key, &next)?;
        Ok(next)
    }

    // ---- algoritma_params ----

    /// Insert a parameter tuple; a zero id is replaced by the next
    /// sequence value.
    pub fn insert_params(&self, mut row: AlgorithmParams) -> Result<AlgorithmParams, StoreError> {
        row.validate().map_err(StoreError::InvalidRow)?;
        if row.id == 0 {
            row.id = self.alloc_id("params")?;
        }
        self.put_row(&keys::params(row.id), &row)?;
        Ok(row)
    }

    /// The parameter row active at `now`: `active_from <= now` and not yet
    /// expired, most recently activated first (ties broken by highest id).
    pub fn active_params(&self, now: DateTime<Utc>) -> Result<Option<AlgorithmParams>, StoreError> {
        let rows: Vec<AlgorithmParams> = self.scan_rows("params:")?;
        Ok(rows
            .into_iter()
            .filter(|p| p.is_active_at(now))
            .max_by_key(|p| (p.active_from, p.id)))
    }

    // ---- user_document ----

    pub fn insert_user_document(&self, mut row: UserDocument) -> Result<UserDocument, StoreError> {
        if row.id == 0 {
            row.id = self.alloc_id("user_doc")?;
        }
        self.put_row(&keys::user_doc(row.id), &row)?;
        Ok(row)
    }

    pub fn get_user_document(&self, id: u64) -> Result<Option<UserDocument>, StoreError> {
        self.get_row(&keys::user_doc(id))
    }

    // ---- corpus_document ----

    pub fn insert_corpus_document(
        &self,
        mut row: CorpusDocument,
    ) -> Result<CorpusDocument, StoreError> {
        if row.id == 0 {
            row.id = self.alloc_id("corpus")?;
        }
        self.put_row(&keys::corpus(row.id), &row)?;
        Ok(row)
    }

    pub fn get_corpus_document(&self, id: u64) -> Result<Option<CorpusDocument>, StoreError> {
        self.get_row(&keys::corpus(id))
    }

    /// Snapshot of the active corpus, ordered by ascending id. Callers
    /// read this once per check and never re-read mid-check.
    pub fn active_corpus(&self) -> Result<Vec<CorpusDocument>, StoreError> {
        let rows: Vec<CorpusDocument> = self.scan_rows("corpus:")?;
        Ok(rows.into_iter().filter(|c| c.is_active).collect())
    }

    // ---- check_request ----

    pub fn create_check_request(
        &self,
        requested_by: u64,
        doc_id: u64,
        params_id: u64,
        now: DateTime<Utc>,
    ) -> Result<CheckRequest, StoreError> {
        let row = CheckRequest {
            id: self.alloc_id("check")?,
            requested_by,
            doc_id,
            params_id,
            status: CheckStatus::Queued,
            queued_at: now,
            started_at: None,
            finished_at: None,
        };
        self.put_row(&keys::check(row.id), &row)?;
        Ok(row)
    }

    pub fn get_check(&self, id: u64) -> Result<Option<CheckRequest>, StoreError> {
        self.get_row(&keys::check(id))
    }

    fn update_check<F>(&self, id: u64, update: F) -> Result<CheckRequest, StoreError>
    where
        F: FnOnce(&mut CheckRequest),
    {
        let key = keys::check(id);
        let mut row: CheckRequest = self
            .get_row(&key)?
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })?;
        update(&mut row);
        self.put_row(&key, &row)?;
        Ok(row)
    }

    pub fn mark_processing(
        &self,
        id: u64,
        now: DateTime<Utc>,
    ) -> Result<CheckRequest, StoreError> {
        self.update_check(id, |row| {
            row.status = CheckStatus::Processing;
            row.started_at = Some(now);
        })
    }

    pub fn mark_failed(&self, id: u64, now: DateTime<Utc>) -> Result<CheckRequest, StoreError> {
        self.update_check(id, |row| {
            row.status = CheckStatus::Failed;
            row.finished_at = Some(now);
        })
    }

    // ---- check_result / check_match ----

    /// Persist a completed check in one atomic batch: the result row, all
    /// match rows and the terminal `done` transition of the request row
    /// become visible together or not at all.
    pub fn commit_result(
        &self,
        check_id: u64,
        similarity: f64,
        summary_json: String,
        matches: Vec<CheckMatchRow>,
        now: DateTime<Utc>,
    ) -> Result<(CheckResultRow, usize), StoreError> {
        let check_key = keys::check(check_id);
        let mut check: CheckRequest = self
            .get_row(&check_key)?
            .ok_or_else(|| StoreError::NotFound { key: check_key.clone() })?;
        check.status = CheckStatus::Done;
        check.finished_at = Some(now);

        let result = CheckResultRow {
            id: self.alloc_id("result")?,
            check_id,
            similarity,
            report_path: None,
            summary_json,
            created_at: now,
        };

        let mut entries = Vec::with_capacity(matches.len() + 2);
        entries.push((check_key, self.encode(&check)?));
        entries.push((keys::result(check_id), self.encode(&result)?));
        for (seq, m) in matches.iter().enumerate() {
            let row = CheckMatchRow {
                id: seq as u64 + 1,
                result_id: result.id,
                ..m.clone()
            };
            entries.push((keys::match_row(result.id, seq), self.encode(&row)?));
        }

        let inserted = matches.len();
        self.backend.batch_put(entries)?;
        Ok((result, inserted))
    }

    pub fn result_for_check(&self, check_id: u64) -> Result<Option<CheckResultRow>, StoreError> {
        self.get_row(&keys::result(check_id))
    }

    /// Match rows for a result, ordered by descending `match_score` (ties
    /// by ascending id, the insertion order).
    pub fn matches_for_result(&self, result_id: u64) -> Result<Vec<CheckMatchRow>, StoreError> {
        let mut rows: Vec<CheckMatchRow> = self.scan_rows(&keys::match_prefix(result_id))?;
        rows.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    // ---- verification_note ----

    /// Insert or replace the single note attached to a result.
    pub fn upsert_verification_note(
        &self,
        mut row: VerificationNote,
    ) -> Result<VerificationNote, StoreError> {
        if row.id == 0 {
            row.id = self.alloc_id("note")?;
        }
        self.put_row(&keys::note(row.result_id), &row)?;
        Ok(row)
    }

    pub fn note_for_result(
        &self,
        result_id: u64,
    ) -> Result<Option<VerificationNote>, StoreError> {
        self.get_row(&keys::note(result_id))
    }

    // ---- corpus signature cache ----

    /// Cached MinHash signature for `(params_id, corpus_id)`, if any.
    /// Callers must compare `text_sha256` before trusting the entry.
    pub fn cached_signature(
        &self,
        params_id: u64,
        corpus_id: u64,
    ) -> Result<Option<CachedSignature>, StoreError> {
        self.get_row(&keys::sig_cache(params_id, corpus_id))
    }

    pub fn store_cached_signature(&self, entry: &CachedSignature) -> Result<(), StoreError> {
        self.put_row(&keys::sig_cache(entry.params_id, entry.corpus_id), entry)
    }
}

/// Read a normalized-text file (UTF-8, LF-terminated). The pipeline reads
/// these files and never writes them.
pub fn read_normalized_text(path: &str) -> Result<String, StoreError> {
    fs::read_to_string(Path::new(path)).map_err(|source| StoreError::TextFile {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn mem_store() -> Store {
        Store::new(StoreConfig::new()).expect("in-memory store")
    }

    fn params(active_from: i64, active_to: Option<i64>) -> AlgorithmParams {
        AlgorithmParams {
            id: 0,
            k: 5,
            w: 4,
            base: 257,
            threshold: 0.8,
            active_from: ts(active_from),
            active_to: active_to.map(ts),
        }
    }

    fn corpus_doc(title: &str, active: bool) -> CorpusDocument {
        CorpusDocument {
            id: 0,
            title: title.to_string(),
            source_type: SourceType::Upload,
            source_ref: format!("upload/{title}"),
            path_text: format!("/tmp/{title}.txt"),
            is_active: active,
        }
    }

    fn match_row(score: f64) -> CheckMatchRow {
        CheckMatchRow {
            id: 0,
            result_id: 0,
            source_type: SourceType::Upload,
            source_id: 1,
            doc_span_start: 0,
            doc_span_end: 10,
            src_span_start: 5,
            src_span_end: 15,
            match_score: score,
            snippet_hash: "12345".to_string(),
        }
    }

    #[test]
    fn params_roundtrip_and_id_allocation() {
        let store = mem_store();
        let a = store.insert_params(params(100, None)).unwrap();
        let b = store.insert_params(params(200, None)).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn invalid_params_rejected() {
        let store = mem_store();
        let bad = AlgorithmParams {
            threshold: 2.0,
            ..params(100, None)
        };
        assert!(matches!(
            store.insert_params(bad),
            Err(StoreError::InvalidRow(_))
        ));
    }

    #[test]
    fn active_params_picks_most_recently_activated() {
        let store = mem_store();
        store.insert_params(params(100, None)).unwrap();
        let newer = store.insert_params(params(500, None)).unwrap();
        store.insert_params(params(200, Some(300))).unwrap();

        let active = store.active_params(ts(1_000)).unwrap().unwrap();
        assert_eq!(active.id, newer.id);

        // Before anything activates, there is no active row.
        assert!(store.active_params(ts(50)).unwrap().is_none());
    }

    #[test]
    fn expired_params_not_active() {
        let store = mem_store();
        store.insert_params(params(100, Some(200))).unwrap();
        assert!(store.active_params(ts(250)).unwrap().is_none());
        assert!(store.active_params(ts(150)).unwrap().is_some());
    }

    #[test]
    fn active_corpus_filters_and_orders() {
        let store = mem_store();
        let a = store.insert_corpus_document(corpus_doc("alpha", true)).unwrap();
        store.insert_corpus_document(corpus_doc("inactive", false)).unwrap();
        let c = store.insert_corpus_document(corpus_doc("gamma", true)).unwrap();

        let active = store.active_corpus().unwrap();
        assert_eq!(
            active.iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![a.id, c.id]
        );
    }

    #[test]
    fn check_state_machine_timestamps() {
        let store = mem_store();
        let check = store.create_check_request(7, 3, 1, ts(100)).unwrap();
        assert_eq!(check.status, CheckStatus::Queued);
        assert_eq!(check.queued_at, ts(100));
        assert!(check.started_at.is_none());

        let check = store.mark_processing(check.id, ts(101)).unwrap();
        assert_eq!(check.status, CheckStatus::Processing);
        assert_eq!(check.started_at, Some(ts(101)));
        assert!(check.finished_at.is_none());

        let check = store.mark_failed(check.id, ts(102)).unwrap();
        assert_eq!(check.status, CheckStatus::Failed);
        assert_eq!(check.finished_at, Some(ts(102)));
    }

    #[test]
    fn commit_result_is_atomic_and_terminal() {
        let store = mem_store();
        let check = store.create_check_request(7, 3, 1, ts(100)).unwrap();
        store.mark_processing(check.id, ts(101)).unwrap();

        let (result, inserted) = store
            .commit_result(
                check.id,
                42.5,
                "{}".to_string(),
                vec![match_row(0.2), match_row(0.9)],
                ts(105),
            )
            .unwrap();
        assert_eq!(inserted, 2);

        let check = store.get_check(check.id).unwrap().unwrap();
        assert_eq!(check.status, CheckStatus::Done);
        assert_eq!(check.finished_at, Some(ts(105)));

        let stored = store.result_for_check(check.id).unwrap().unwrap();
        assert_eq!(stored, result);
        assert_eq!(stored.similarity, 42.5);

        let matches = store.matches_for_result(result.id).unwrap();
        assert_eq!(matches.len(), 2);
        // Ordered by score descending.
        assert_eq!(matches[0].match_score, 0.9);
        assert_eq!(matches[1].match_score, 0.2);
        assert!(matches.iter().all(|m| m.result_id == result.id));
    }

    #[test]
    fn missing_check_cannot_transition() {
        let store = mem_store();
        assert!(matches!(
            store.mark_failed(99, ts(1)),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn verification_note_is_unique_per_result() {
        let store = mem_store();
        let note = VerificationNote {
            id: 0,
            result_id: 5,
            verifier_id: 2,
            status: VerificationStatus::PerluRevisi,
            note_text: "needs revision".to_string(),
            created_at: ts(100),
        };
        store.upsert_verification_note(note.clone()).unwrap();

        let replacement = VerificationNote {
            status: VerificationStatus::Wajar,
            note_text: "fine after review".to_string(),
            ..note
        };
        store.upsert_verification_note(replacement).unwrap();

        let stored = store.note_for_result(5).unwrap().unwrap();
        assert_eq!(stored.status, VerificationStatus::Wajar);
    }

    #[test]
    fn signature_cache_roundtrip() {
        let store = mem_store();
        assert!(store.cached_signature(1, 2).unwrap().is_none());

        let entry = CachedSignature {
            params_id: 1,
            corpus_id: 2,
            text_sha256: "abc".to_string(),
            signature: vec![1, 2, 3],
        };
        store.store_cached_signature(&entry).unwrap();
        assert_eq!(store.cached_signature(1, 2).unwrap(), Some(entry));
    }

    #[test]
    fn read_normalized_text_reports_path() {
        let err = read_normalized_text("/definitely/not/here.txt").unwrap_err();
        match err {
            StoreError::TextFile { path, .. } => {
                assert_eq!(path, "/definitely/not/here.txt");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn redb_backed_store_roundtrip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let cfg = StoreConfig::new().with_backend(BackendConfig::redb(file.path()));
        let store = Store::new(cfg).unwrap();

        let p = store.insert_params(params(100, None)).unwrap();
        let active = store.active_params(ts(200)).unwrap().unwrap();
        assert_eq!(active, p);
    }
}
