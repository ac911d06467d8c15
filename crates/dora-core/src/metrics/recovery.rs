//! Mean time to recovery around hotfix pull requests.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{mean, MetricContext};
use crate::domain::PullRequest;
use crate::duration::format_duration;
use crate::error::Result;
use crate::lineage::LineageResolver;
use crate::obs;
use crate::scm::PullRequestSource;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    pub mean_time_to_recovery_seconds: Option<f64>,
    pub mean_time_to_recovery_duration: Option<String>,
}

/// Hotfix pull requests plus the change each hotfix run recovered from.
///
/// `prs` is newest first. Every hotfix is kept, and after each run of
/// consecutive hotfixes the next older pull request is kept too, when there
/// is one.
pub fn select_recovery_window(prs: &[PullRequest], hotfix_marker: &str) -> Result<Vec<PullRequest>> {
    let mut hotfix = Vec::with_capacity(prs.len());
    for pr in prs {
        hotfix.push(pr.is_hotfix(hotfix_marker)?);
    }

    let mut selected = Vec::new();
    for (index, pr) in prs.iter().enumerate() {
        if hotfix[index] {
            selected.push(pr.clone());
            let next_is_hotfix = hotfix.get(index + 1).copied();
            if next_is_hotfix == Some(false) {
                selected.push(prs[index + 1].clone());
            }
        }
    }
    Ok(selected)
}

/// Mean absolute gap between adjacent completion times.
///
/// Null when fewer than two completions are known.
pub fn calculate(finished: &[DateTime<Utc>]) -> RecoveryReport {
    let gaps: Vec<f64> = finished
        .windows(2)
        .map(|pair| (pair[0] - pair[1]).num_seconds().abs() as f64)
        .collect();
    let mean_secs = mean(&gaps);
    RecoveryReport {
        mean_time_to_recovery_seconds: mean_secs,
        mean_time_to_recovery_duration: mean_secs.map(format_duration),
    }
}

pub async fn run(ctx: &MetricContext<'_>) -> Result<RecoveryReport> {
    let prs = PullRequestSource::new(ctx.transport, ctx.scm_workspace, &ctx.project.repo_slug)
        .merged()
        .await?;
    let window = select_recovery_window(&prs, &ctx.options.hotfix_marker)?;
    let resolved = LineageResolver::new(ctx.transport, ctx.project, ctx.options)
        .resolve_in_order(&window)
        .await?;
    let finished: Vec<DateTime<Utc>> = resolved.iter().map(|s| s.production_finished).collect();
    obs::emit_metric_calculated("mean-time-to-recovery", finished.len());
    Ok(calculate(&finished))
}
