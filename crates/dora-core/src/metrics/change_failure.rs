//! Change failure rate from hotfix branch names.

use serde::Serialize;

use super::MetricContext;
use crate::domain::PullRequest;
use crate::error::Result;
use crate::obs;
use crate::scm::PullRequestSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFailureReport {
    pub percentage_of_change_failures: Option<u32>,
}

/// Percentage of hotfix pull requests, truncated to an integer.
///
/// The most recent pull request cannot be judged yet and is left out of both
/// counts; with nothing left to judge the result is null.
pub fn calculate(prs: &[PullRequest], hotfix_marker: &str) -> Result<ChangeFailureReport> {
    let judged = prs.get(1..).unwrap_or_default();
    if judged.is_empty() {
        return Ok(ChangeFailureReport {
            percentage_of_change_failures: None,
        });
    }

    let mut failures = 0usize;
    for pr in judged {
        if pr.is_hotfix(hotfix_marker)? {
            failures += 1;
        }
    }

    Ok(ChangeFailureReport {
        percentage_of_change_failures: Some((failures * 100 / judged.len()) as u32),
    })
}

pub async fn run(ctx: &MetricContext<'_>) -> Result<ChangeFailureReport> {
    let prs = PullRequestSource::new(ctx.transport, ctx.scm_workspace, &ctx.project.repo_slug)
        .merged()
        .await?;
    let report = calculate(&prs, &ctx.options.hotfix_marker)?;
    obs::emit_metric_calculated("change-failure-rate", prs.len());
    Ok(report)
}
