//! Lead time for changes: first staging attempt to production completion.

use serde::Serialize;

use super::{mean, MetricContext};
use crate::domain::StageTimestamps;
use crate::duration::format_duration;
use crate::error::Result;
use crate::lineage::LineageResolver;
use crate::obs;
use crate::scm::PullRequestSource;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadTimeReport {
    pub mean_duration_in_seconds: Option<f64>,
    pub mean_duration_in_duration: Option<String>,
}

/// Mean lead time over resolved pull requests; null when none resolved.
pub fn calculate(resolved: &[StageTimestamps]) -> LeadTimeReport {
    let secs: Vec<f64> = resolved.iter().map(|s| s.lead_time_secs() as f64).collect();
    let mean_secs = mean(&secs);
    LeadTimeReport {
        mean_duration_in_seconds: mean_secs,
        mean_duration_in_duration: mean_secs.map(format_duration),
    }
}

pub async fn run(ctx: &MetricContext<'_>) -> Result<LeadTimeReport> {
    let prs = PullRequestSource::new(ctx.transport, ctx.scm_workspace, &ctx.project.repo_slug)
        .merged()
        .await?;
    let resolved = LineageResolver::new(ctx.transport, ctx.project, ctx.options)
        .resolve_in_order(&prs)
        .await?;
    obs::emit_metric_calculated("lead-time", resolved.len());
    Ok(calculate(&resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn stamps(start: i64, finish: i64) -> StageTimestamps {
        StageTimestamps {
            staging_build: 2,
            acceptance_build: 2,
            production_build: 2,
            staging_identified: Utc.timestamp_opt(start, 0).unwrap(),
            staging_green: Utc.timestamp_opt(start, 0).unwrap(),
            production_finished: Utc.timestamp_opt(finish, 0).unwrap(),
        }
    }

    #[test]
    fn test_mean_lead_time() {
        let report = calculate(&[stamps(0, 3_600), stamps(100, 7_300)]);
        assert_eq!(report.mean_duration_in_seconds, Some(5_400.0));
        assert_eq!(
            report.mean_duration_in_duration.as_deref(),
            Some("1 hr(s), 30 min(s), 00 sec(s)")
        );
    }

    #[test]
    fn test_no_resolved_changes_is_null() {
        let report = calculate(&[]);
        assert!(report.mean_duration_in_seconds.is_none());
        assert!(report.mean_duration_in_duration.is_none());
    }
}
