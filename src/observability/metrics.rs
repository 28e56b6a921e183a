//! Provisioning metrics.
//!
//! # Metrics
//! - `provisioner_attempts_total` (counter): backend calls by operation and
//!   outcome (`success`, `transient`, `entity_not_found`,
//!   `entity_already_exists`, `permanent`)
//! - `provisioner_runs_total` (counter): finished runs by path (`found`,
//!   `created`, `conflict_resolved`) or `failed`
//!
//! Emitted through the `metrics` facade; without an installed recorder the
//! calls are no-ops.

/// Count one backend call.
pub fn record_attempt(operation: &'static str, outcome: &'static str) {
    metrics::counter!(
        "provisioner_attempts_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Count one finished provisioning run.
pub fn record_run(path: &'static str) {
    metrics::counter!("provisioner_runs_total", "path" => path).increment(1);
}
