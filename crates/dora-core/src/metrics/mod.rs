//! The four DORA metric calculators.

pub mod change_failure;
pub mod deployment_frequency;
pub mod lead_time;
pub mod recovery;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::MetricOptions;
use crate::error::{MetricsError, Result};
use crate::obs::{self, MetricSpan};
use crate::registry::ProjectConfig;
use crate::transport::Transport;

pub use change_failure::ChangeFailureReport;
pub use deployment_frequency::DeploymentFrequencyReport;
pub use lead_time::LeadTimeReport;
pub use recovery::RecoveryReport;

/// Which metric to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    DeploymentFrequency,
    LeadTime,
    MeanTimeToRecovery,
    ChangeFailureRate,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::DeploymentFrequency,
        MetricKind::LeadTime,
        MetricKind::MeanTimeToRecovery,
        MetricKind::ChangeFailureRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::DeploymentFrequency => "deployment-frequency",
            MetricKind::LeadTime => "lead-time",
            MetricKind::MeanTimeToRecovery => "mean-time-to-recovery",
            MetricKind::ChangeFailureRate => "change-failure-rate",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown metric: {}", s))
    }
}

/// Output of one metric computation, serialized without a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricReport {
    DeploymentFrequency(DeploymentFrequencyReport),
    LeadTime(LeadTimeReport),
    MeanTimeToRecovery(RecoveryReport),
    ChangeFailureRate(ChangeFailureReport),
}

/// Inputs shared by every calculator for one invocation.
#[derive(Clone, Copy)]
pub struct MetricContext<'a> {
    pub transport: &'a dyn Transport,
    pub project: &'a ProjectConfig,
    pub options: &'a MetricOptions,
    /// SCM workspace owning the project's repository.
    pub scm_workspace: &'a str,
}

/// Compute one metric under the invocation timeout.
pub async fn run_metric(kind: MetricKind, ctx: MetricContext<'_>) -> Result<MetricReport> {
    let span = MetricSpan::new(kind.as_str(), ctx.project.project_id);
    let timeout = ctx.options.invocation_timeout;

    let computation = span.instrument(async move {
        match kind {
            MetricKind::DeploymentFrequency => deployment_frequency::run(&ctx)
                .await
                .map(MetricReport::DeploymentFrequency),
            MetricKind::LeadTime => lead_time::run(&ctx).await.map(MetricReport::LeadTime),
            MetricKind::MeanTimeToRecovery => recovery::run(&ctx)
                .await
                .map(MetricReport::MeanTimeToRecovery),
            MetricKind::ChangeFailureRate => change_failure::run(&ctx)
                .await
                .map(MetricReport::ChangeFailureRate),
        }
    });

    let result = match tokio::time::timeout(timeout, computation).await {
        Ok(result) => result,
        Err(_) => Err(MetricsError::Timeout {
            secs: timeout.as_secs(),
        }),
    };
    if let Err(err) = &result {
        obs::emit_metric_failed(kind.as_str(), err);
    }
    result
}

/// Arithmetic mean; `None` for an empty slice.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// ISO-8601 at second precision with an explicit UTC offset.
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in MetricKind::ALL {
            assert_eq!(kind.as_str().parse::<MetricKind>().unwrap(), kind);
        }
        assert!("velocity".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_reports_serialize_untagged_camel_case() {
        let report = MetricReport::ChangeFailureRate(ChangeFailureReport {
            percentage_of_change_failures: Some(25),
        });
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({ "percentageOfChangeFailures": 25 })
        );

        let report = MetricReport::LeadTime(LeadTimeReport {
            mean_duration_in_seconds: None,
            mean_duration_in_duration: None,
        });
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({ "meanDurationInSeconds": null, "meanDurationInDuration": null })
        );
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }
}
