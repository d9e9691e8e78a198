// Metrics hooks for the checker crate.
//
// Callers install a global `CheckMetrics` implementation via
// [`set_check_metrics`]; `DefaultChecker` then reports the outcome of
// every `run_check` call. This keeps instrumentation decoupled from any
// specific metrics backend.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

/// Metrics observer for check runs.
pub trait CheckMetrics: Send + Sync {
    /// Record one finished check.
    ///
    /// `outcome` is the terminal request status (`done`) or the stable
    /// error kind string; `latency` is wall-clock time from request
    /// creation to the terminal transition.
    fn record_check(&self, outcome: &str, latency: Duration, candidates: usize, matches: usize);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn CheckMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn CheckMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn CheckMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global check metrics recorder.
///
/// Typically called once during service startup so every `DefaultChecker`
/// shares the same metrics backend.
pub fn set_check_metrics(recorder: Option<Arc<dyn CheckMetrics>>) {
    let lock = metrics_lock();
    let mut guard = lock.write().expect("check metrics lock poisoned");
    *guard = recorder;
}
