use std::fs;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tempfile::TempDir;

use simcheck::{
    AlgorithmParams, BackendConfig, CheckJob, CheckRunner, CheckStatus, CheckSummary,
    CorpusDocument, DefaultChecker, DocumentStatus, SourceType, Store, StoreConfig, UserDocument,
};

/// A long run of text shared verbatim between the document and one corpus
/// entry; big enough that LSH pruning keeps the pair together with
/// overwhelming probability.
const SHARED_BLOCK: &str = "similarity detection pipelines normalize the text first then \
slice it into overlapping character grams hash every gram select window minima through \
winnowing and compress the surviving set into a fixed length minhash signature whose banded \
buckets drive candidate retrieval across the whole reference corpus without pairwise scans \
over every stored document";

const UNRELATED: &str = "meanwhile the gardening almanac recommends pruning apple orchards \
late in winter because dormant wood heals quickly and the sap has not yet risen through \
the trunk";

struct Env {
    store: Arc<Store>,
    _dir: TempDir,
    dir_path: std::path::PathBuf,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let dir_path = dir.path().to_path_buf();
        let store = Arc::new(Store::new(StoreConfig::new()).expect("store"));
        Self {
            store,
            _dir: dir,
            dir_path,
        }
    }

    fn with_store(store: Arc<Store>) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let dir_path = dir.path().to_path_buf();
        Self {
            store,
            _dir: dir,
            dir_path,
        }
    }

    fn write(&self, name: &str, content: &str) -> String {
        let path = self.dir_path.join(name);
        fs::write(&path, content).expect("write fixture text");
        path.to_string_lossy().into_owned()
    }

    fn params(&self, k: usize, w: usize, threshold: f64) -> AlgorithmParams {
        self.store
            .insert_params(AlgorithmParams {
                id: 0,
                k,
                w,
                base: 257,
                threshold,
                active_from: Utc::now() - ChronoDuration::hours(1),
                active_to: None,
            })
            .expect("params")
    }

    fn document(&self, owner: u64, content: &str) -> UserDocument {
        let path_text = self.write("document.txt", content);
        self.store
            .insert_user_document(UserDocument {
                id: 0,
                owner,
                title: "submission".to_string(),
                mime_type: "text/plain".to_string(),
                size_bytes: content.len() as u64,
                status: DocumentStatus::Ready,
                path_raw: None,
                path_text,
            })
            .expect("user document")
    }

    fn corpus(&self, title: &str, content: &str) -> CorpusDocument {
        let path_text = self.write(&format!("{title}.txt"), content);
        self.store
            .insert_corpus_document(CorpusDocument {
                id: 0,
                title: title.to_string(),
                source_type: SourceType::Url,
                source_ref: format!("https://corpus.example/{title}"),
                path_text,
                is_active: true,
            })
            .expect("corpus document")
    }

    fn run(&self, doc: &UserDocument) -> simcheck::CheckOutcome {
        DefaultChecker::with_defaults(self.store.clone())
            .run_check(&CheckJob {
                doc_id: doc.id,
                requested_by: doc.owner,
                max_candidates: None,
                cancel: None,
            })
            .expect("check completes")
    }

    fn summary(&self, check_id: u64) -> CheckSummary {
        let row = self
            .store
            .result_for_check(check_id)
            .expect("result read")
            .expect("result exists");
        serde_json::from_str(&row.summary_json).expect("summary parses")
    }
}

#[test]
fn partial_overlap_yields_one_candidate_and_strict_similarity() {
    let env = Env::new();
    env.params(5, 4, 0.2);

    let doc_text = format!("{SHARED_BLOCK} closing remarks by the author");
    let source_text = format!("{SHARED_BLOCK} entirely different trailing words");
    let doc = env.document(1, &doc_text);
    let overlap = env.corpus("overlap-source", &source_text);
    env.corpus("unrelated-source", UNRELATED);

    let outcome = env.run(&doc);

    // Only the overlapping source survives LSH pruning.
    let summary = env.summary(outcome.check_id);
    assert_eq!(summary.candidates.len(), 1);
    assert_eq!(summary.candidates[0].id_corpus, overlap.id);
    assert!(summary.candidates[0].approx > 0.0);

    // Similarity is strictly between the extremes.
    assert!(
        outcome.similarity > 0.0 && outcome.similarity < 100.0,
        "similarity {} not strictly partial",
        outcome.similarity
    );
    assert!(summary.best_similarity > 0.0 && summary.best_similarity < 1.0);

    // The shared block merges into one, at most two, spans.
    assert!(
        (1..=2).contains(&outcome.matches_inserted),
        "expected 1-2 spans, got {}",
        outcome.matches_inserted
    );

    let matches = env
        .store
        .matches_for_result(outcome.result_id)
        .expect("matches read");
    for m in &matches {
        assert!(m.doc_span_start < m.doc_span_end);
        assert!(m.src_span_start < m.src_span_end);
        assert!((0.0..=1.0).contains(&m.match_score));
        assert_eq!(m.source_id, overlap.id);
        assert_eq!(m.source_type, SourceType::Url);
    }
}

#[test]
fn similarity_percent_is_rounded_to_two_decimals() {
    let env = Env::new();
    env.params(5, 4, 0.0);

    let doc = env.document(1, &format!("{SHARED_BLOCK} unique document ending here"));
    env.corpus("near-twin", &format!("{SHARED_BLOCK} another ending over there"));

    let outcome = env.run(&doc);
    let summary = env.summary(outcome.check_id);

    let expected = (summary.best_similarity * 10_000.0).round() / 100.0;
    assert_eq!(outcome.similarity, expected);
    assert!((0.0..=100.0).contains(&outcome.similarity));

    // Two decimals: scaling by 100 yields an integer.
    let scaled = outcome.similarity * 100.0;
    assert!((scaled - scaled.round()).abs() < 1e-9);
}

#[test]
fn candidates_rank_by_estimate_then_id() {
    let env = Env::new();
    env.params(5, 4, 0.9);

    let doc = env.document(1, SHARED_BLOCK);
    let twin_a = env.corpus("twin-a", SHARED_BLOCK);
    let twin_b = env.corpus("twin-b", SHARED_BLOCK);
    let partial = env.corpus(
        "partial",
        &format!("{SHARED_BLOCK} with an extended unrelated tail that lowers the estimate considerably"),
    );

    let outcome = env.run(&doc);
    let summary = env.summary(outcome.check_id);

    assert_eq!(summary.candidates.len(), 3);
    // Exact twins tie at the top, ordered by id; the diluted copy follows.
    assert_eq!(summary.candidates[0].id_corpus, twin_a.id);
    assert_eq!(summary.candidates[1].id_corpus, twin_b.id);
    assert_eq!(summary.candidates[2].id_corpus, partial.id);
    assert!(summary.candidates[1].approx >= summary.candidates[2].approx);
}

#[test]
fn summary_json_has_the_wire_shape() {
    let env = Env::new();
    let params = env.params(5, 4, 0.8);

    let doc = env.document(1, SHARED_BLOCK);
    env.corpus("twin", SHARED_BLOCK);

    let outcome = env.run(&doc);
    let row = env
        .store
        .result_for_check(outcome.check_id)
        .unwrap()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&row.summary_json).unwrap();

    assert_eq!(value["params"]["id_params"], params.id);
    assert_eq!(value["params"]["k"], 5);
    assert_eq!(value["params"]["w"], 4);
    assert_eq!(value["params"]["threshold"], 0.8);
    assert!(value["candidates"].is_array());
    assert_eq!(value["candidates"][0]["title"], "twin");
    assert_eq!(value["best_similarity"], 1.0);
}

#[test]
fn inactive_corpus_entries_are_invisible() {
    let env = Env::new();
    env.params(5, 4, 0.8);

    let doc = env.document(1, SHARED_BLOCK);
    let path = env.write("retired.txt", SHARED_BLOCK);
    env.store
        .insert_corpus_document(CorpusDocument {
            id: 0,
            title: "retired".to_string(),
            source_type: SourceType::Upload,
            source_ref: "upload/retired".to_string(),
            path_text: path,
            is_active: false,
        })
        .unwrap();

    let outcome = env.run(&doc);
    assert_eq!(outcome.candidates_count, 0);
    assert_eq!(outcome.similarity, 0.0);
}

#[test]
fn results_survive_a_store_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("simcheck.redb");

    let outcome = {
        let store = Arc::new(
            Store::new(StoreConfig::new().with_backend(BackendConfig::redb(&db_path))).unwrap(),
        );
        let env = Env::with_store(store);
        env.params(5, 4, 0.8);
        let doc = env.document(1, SHARED_BLOCK);
        env.corpus("twin", SHARED_BLOCK);
        env.run(&doc)
    };

    // Reopen the database and read everything back.
    let store =
        Store::new(StoreConfig::new().with_backend(BackendConfig::redb(&db_path))).unwrap();
    let check = store.get_check(outcome.check_id).unwrap().unwrap();
    assert_eq!(check.status, CheckStatus::Done);

    let result = store.result_for_check(outcome.check_id).unwrap().unwrap();
    assert_eq!(result.similarity, 100.0);

    let matches = store.matches_for_result(result.id).unwrap();
    assert_eq!(matches.len(), outcome.matches_inserted);
}
