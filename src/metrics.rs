//! Metric recording helpers.
//!
//! All metrics are prefixed with `shortlink_` and follow Prometheus
//! conventions: counters end in `_total`, histograms track distributions.
//! Export is wired up by the embedding process; this module only records.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record one reconcile pass and its outcome
/// (`published`, `invalidated`, `removed`, `up_to_date`, `error`).
pub fn record_reconcile(outcome: &'static str, duration: Duration) {
    counter!("shortlink_reconciles_total", "outcome" => outcome).increment(1);
    histogram!("shortlink_reconcile_duration_seconds").record(duration.as_secs_f64());
}

/// Record a retry scheduled by the reconcile machinery
/// (`conflict` for immediate status-write retries, `backoff` for requeues).
pub fn record_reconcile_retry(kind: &'static str) {
    counter!("shortlink_reconcile_retries_total", "kind" => kind).increment(1);
}

/// Record a full list resync triggered by watch-stream loss.
pub fn record_resync() {
    counter!("shortlink_resyncs_total").increment(1);
}

/// Record one redirect lookup.
pub fn record_redirect(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!("shortlink_redirects_total", "outcome" => outcome).increment(1);
}
