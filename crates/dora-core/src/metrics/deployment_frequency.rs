//! Deployment frequency from a deployment job's build history.

use serde::Serialize;

use super::{format_datetime, MetricContext};
use crate::ci_query;
use crate::domain::{parse_build_list, BuildRecord};
use crate::duration::format_duration;
use crate::error::{MetricsError, Result};
use crate::obs;
use crate::transport::Target;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentFrequencyReport {
    pub number_of_deployments: usize,
    pub latest_build_datetime: Option<String>,
    pub first_build_datetime: Option<String>,
    pub time_between_latest_and_first_build: Option<String>,
}

/// Summarise the green builds in `builds`.
///
/// No green builds yields a zero count with null fields. Green builds that
/// do not span a positive window are an error.
pub fn calculate(builds: &[BuildRecord]) -> Result<DeploymentFrequencyReport> {
    let green: Vec<&BuildRecord> = builds.iter().filter(|b| b.is_green()).collect();

    let (Some(latest), Some(first)) = (
        green.iter().max_by_key(|b| b.timestamp_ms),
        green.iter().min_by_key(|b| b.timestamp_ms),
    ) else {
        return Ok(DeploymentFrequencyReport {
            number_of_deployments: 0,
            latest_build_datetime: None,
            first_build_datetime: None,
            time_between_latest_and_first_build: None,
        });
    };

    let span_ms = latest.timestamp_ms - first.timestamp_ms;
    if span_ms <= 0 {
        return Err(MetricsError::InvalidMeasurement(
            "unexpected duration between latest and first build of the job".to_string(),
        ));
    }

    Ok(DeploymentFrequencyReport {
        number_of_deployments: green.len(),
        latest_build_datetime: Some(format_datetime(latest.started_at()?)),
        first_build_datetime: Some(format_datetime(first.started_at()?)),
        time_between_latest_and_first_build: Some(format_duration(span_ms as f64 / 1000.0)),
    })
}

/// Fetch the deployment job's builds and summarise them.
pub async fn run(ctx: &MetricContext<'_>) -> Result<DeploymentFrequencyReport> {
    let path = ci_query::build_list(&ctx.project.deployment_job);
    let data = ctx.transport.request(Target::Ci, &path).await.into_data(&path)?;
    let builds =
        parse_build_list(&data, &ctx.options.default_branch_job).map_err(|e| e.at(&path))?;
    let report = calculate(&builds)?;
    obs::emit_metric_calculated("deployment-frequency", report.number_of_deployments);
    Ok(report)
}
