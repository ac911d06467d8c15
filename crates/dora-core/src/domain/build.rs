//! CI build records.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::extract::{as_u64, entries, field, i64_field, u64_field};
use crate::duration::{datetime_from_millis, datetime_from_secs, epoch_secs};
use crate::error::{MetricsError, Result};

/// Outcome of a CI build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    Aborted,
    NotBuilt,
    /// No result yet: the build is still running.
    InProgress,
    Unknown,
}

impl BuildResult {
    /// Parse the CI server's result string; `None` means still running.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => BuildResult::InProgress,
            Some("SUCCESS") => BuildResult::Success,
            Some("UNSTABLE") => BuildResult::Unstable,
            Some("FAILURE") => BuildResult::Failure,
            Some("ABORTED") => BuildResult::Aborted,
            Some("NOT_BUILT") => BuildResult::NotBuilt,
            Some(_) => BuildResult::Unknown,
        }
    }

    /// Success is the only green result.
    pub fn is_green(&self) -> bool {
        matches!(self, BuildResult::Success)
    }
}

/// One CI build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRecord {
    pub number: u64,
    pub result: BuildResult,
    /// Start time, epoch milliseconds.
    pub timestamp_ms: i64,
    /// Run time in milliseconds, when reported.
    pub duration_ms: Option<i64>,
    /// Upstream build numbers recorded as causes of this build.
    pub upstream_builds: Vec<u64>,
    pub url: Option<String>,
    /// Link to the next build of the same job.
    pub next_build_url: Option<String>,
}

impl BuildRecord {
    /// Parse a build map from JSON or XML-decoded data.
    ///
    /// `number` falls back to `id`; `timestamp` is required.
    pub fn from_value(value: &Value) -> Result<Self> {
        let number = match u64_field(value, &["number"]) {
            Ok(number) => number,
            Err(_) => u64_field(value, &["id"]).map_err(|_| MetricsError::missing("number"))?,
        };
        let timestamp_ms = i64_field(value, &["timestamp"])?;
        let duration_ms = i64_field(value, &["duration"]).ok();
        let result = BuildResult::parse(value.get("result").and_then(Value::as_str));

        Ok(BuildRecord {
            number,
            result,
            timestamp_ms,
            duration_ms,
            upstream_builds: upstream_builds(value),
            url: value.get("url").and_then(Value::as_str).map(str::to_string),
            next_build_url: field(value, &["nextBuild", "url"])
                .ok()
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    pub fn is_green(&self) -> bool {
        self.result.is_green()
    }

    /// Start time at second precision.
    pub fn started_at(&self) -> Result<DateTime<Utc>> {
        datetime_from_millis(self.timestamp_ms)
    }

    /// Start plus duration, both truncated to seconds.
    pub fn finished_at(&self) -> Result<DateTime<Utc>> {
        let duration_ms = self
            .duration_ms
            .ok_or_else(|| MetricsError::missing("build.duration"))?;
        datetime_from_secs(epoch_secs(self.timestamp_ms) + epoch_secs(duration_ms))
    }
}

fn upstream_builds(value: &Value) -> Vec<u64> {
    let actions = value.get("actions").or_else(|| value.get("action"));
    actions
        .map(entries)
        .unwrap_or_default()
        .into_iter()
        .flat_map(|action| {
            action
                .get("causes")
                .or_else(|| action.get("cause"))
                .map(entries)
                .unwrap_or_default()
        })
        .filter_map(|cause| cause.get("upstreamBuild").and_then(as_u64))
        .collect()
}

/// Parse a job's build listing.
///
/// Accepts `allBuilds`, `builds`, or a multibranch `jobs` listing from which
/// the sub-job named `branch_job` is selected.
pub fn parse_build_list(data: &Value, branch_job: &str) -> Result<Vec<BuildRecord>> {
    let builds = if let Some(builds) = data.get("allBuilds").or_else(|| data.get("builds")) {
        builds
    } else if let Some(jobs) = data.get("jobs") {
        let matching: Vec<&Value> = entries(jobs)
            .into_iter()
            .filter(|job| job.get("name").and_then(Value::as_str) == Some(branch_job))
            .collect();
        match matching.as_slice() {
            [job] => field(*job, &["builds"])?,
            [] => return Err(MetricsError::missing(format!("jobs[name={}]", branch_job))),
            _ => {
                return Err(MetricsError::UnexpectedShape {
                    context: format!("unexpected number of sub jobs with name {}", branch_job),
                    url: None,
                })
            }
        }
    } else {
        return Err(MetricsError::missing("builds"));
    };

    entries(builds)
        .into_iter()
        .map(BuildRecord::from_value)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_parsing() {
        assert!(BuildResult::parse(Some("SUCCESS")).is_green());
        assert_eq!(BuildResult::parse(None), BuildResult::InProgress);
        assert_eq!(BuildResult::parse(Some("FAILURE")), BuildResult::Failure);
        assert_eq!(BuildResult::parse(Some("WEIRD")), BuildResult::Unknown);
        assert!(!BuildResult::parse(Some("UNSTABLE")).is_green());
    }

    #[test]
    fn test_build_from_json() {
        let build = BuildRecord::from_value(&json!({
            "number": 57,
            "result": "SUCCESS",
            "timestamp": 1_700_000_000_500i64,
            "duration": 90_999,
            "url": "https://ci.example.com/job/st/57/",
            "nextBuild": { "number": 58, "url": "https://ci.example.com/job/st/58/" },
            "actions": [
                {},
                { "causes": [{ "upstreamBuild": 12, "upstreamUrl": "job/st/" }] }
            ]
        }))
        .unwrap();

        assert_eq!(build.number, 57);
        assert!(build.is_green());
        assert_eq!(build.upstream_builds, vec![12]);
        assert_eq!(
            build.next_build_url.as_deref(),
            Some("https://ci.example.com/job/st/58/")
        );
        assert_eq!(build.started_at().unwrap().timestamp(), 1_700_000_000);
        assert_eq!(build.finished_at().unwrap().timestamp(), 1_700_000_090);
    }

    #[test]
    fn test_build_from_xml_shape() {
        let build = BuildRecord::from_value(&json!({
            "number": "8",
            "timestamp": "1700000000000",
            "action": { "cause": { "upstreamBuild": "44" } }
        }))
        .unwrap();
        assert_eq!(build.number, 8);
        assert_eq!(build.result, BuildResult::InProgress);
        assert_eq!(build.upstream_builds, vec![44]);
        assert!(build.finished_at().is_err());
    }

    #[test]
    fn test_number_falls_back_to_id() {
        let build = BuildRecord::from_value(&json!({ "id": "19", "timestamp": 0 })).unwrap();
        assert_eq!(build.number, 19);
    }

    #[test]
    fn test_missing_timestamp_is_reported() {
        let err = BuildRecord::from_value(&json!({ "number": 3 })).unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn test_build_list_shapes() {
        let flat = json!({ "allBuilds": [{ "number": 2, "timestamp": 2 }, { "number": 1, "timestamp": 1 }] });
        assert_eq!(parse_build_list(&flat, "main").unwrap().len(), 2);

        let multibranch = json!({ "jobs": [
            { "name": "develop", "builds": [{ "number": 9, "timestamp": 9 }] },
            { "name": "main", "builds": [{ "number": 4, "timestamp": 4 }] }
        ]});
        let builds = parse_build_list(&multibranch, "main").unwrap();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].number, 4);

        let duplicated = json!({ "jobs": [
            { "name": "main", "builds": [] },
            { "name": "main", "builds": [] }
        ]});
        assert!(parse_build_list(&duplicated, "main").is_err());

        assert!(parse_build_list(&json!({}), "main").is_err());
    }
}
