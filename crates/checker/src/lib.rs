//! Check orchestration for the simcheck pipeline.
//!
//! [`DefaultChecker`] drives a single check request end to end: load the
//! active parameter snapshot, prune the corpus with LSH over MinHash
//! signatures, confirm the surviving candidates with exact Jaccard over
//! winnowed fingerprints, reconstruct match spans and persist everything
//! in one atomic commit. The core stays single-threaded per check and
//! fully deterministic; the optional fan-out scan re-sorts candidates so
//! ordering never depends on scheduling.

mod engine;
mod metrics;
mod types;

pub use engine::{CheckRunner, DefaultChecker};
pub use metrics::{set_check_metrics, CheckMetrics};
pub use types::{
    CandidateSummary, CheckError, CheckJob, CheckOutcome, CheckSummary, CheckerConfig,
    CorpusWarning, SummaryParams,
};
