//! Structured observability hooks for metric invocations.
//!
//! This module provides:
//! - Invocation-scoped tracing spans via `MetricSpan`
//! - Emission functions for lineage and metric lifecycle events
//!
//! Events are emitted at `info!` level; filter with `RUST_LOG`.

use std::future::Future;

use tracing::instrument::Instrumented;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Span tagged with the metric, the project and a per-invocation id.
///
/// # Example
///
/// ```ignore
/// let span = MetricSpan::new("lead-time", 2);
/// let report = span.instrument(calculate()).await;
/// ```
pub struct MetricSpan {
    span: tracing::Span,
    invocation_id: Uuid,
}

impl MetricSpan {
    pub fn new(metric: &str, project_id: i64) -> Self {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dora.metric",
            metric = %metric,
            project_id = project_id,
            invocation_id = %invocation_id,
        );
        Self {
            span,
            invocation_id,
        }
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    /// Run `future` inside the span.
    pub fn instrument<F: Future>(self, future: F) -> Instrumented<F> {
        future.instrument(self.span)
    }
}

/// Emit event: a pull request was traced to production.
pub fn emit_lineage_resolved(pr_id: &str, staging_build: u64, production_build: u64, lead_time_secs: i64) {
    info!(
        event = "lineage.resolved",
        pr_id = %pr_id,
        staging_build = staging_build,
        production_build = production_build,
        lead_time_secs = lead_time_secs,
    );
}

/// Emit event: CI history ends at this pull request.
pub fn emit_history_limit(pr_id: &str, reason: &dyn std::fmt::Debug) {
    info!(event = "lineage.history_limit", pr_id = %pr_id, reason = ?reason);
}

/// Emit event: a metric was calculated.
pub fn emit_metric_calculated(metric: &str, samples: usize) {
    info!(event = "metric.calculated", metric = %metric, samples = samples);
}

/// Emit event: a metric computation failed (warning level).
pub fn emit_metric_failed(metric: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "metric.failed", metric = %metric, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_ids_are_unique() {
        let a = MetricSpan::new("cfr", 1);
        let b = MetricSpan::new("cfr", 1);
        assert_ne!(a.invocation_id(), b.invocation_id());
    }

    #[tokio::test]
    async fn test_instrumented_future_completes() {
        let span = MetricSpan::new("lead-time", 2);
        assert_eq!(span.instrument(async { 41 + 1 }).await, 42);
    }

    #[test]
    fn test_emitters_do_not_panic() {
        emit_lineage_resolved("42", 10, 3, 3600);
        emit_history_limit("41", &"first staging build");
        emit_metric_calculated("mttr", 0);
        emit_metric_failed("df", &"boom");
    }
}
