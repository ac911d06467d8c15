//! Delivery lineage resolution.
//!
//! Given a merged pull request, [`LineageResolver`] follows the chain of
//! cross-references between the SCM host and the CI server:
//!
//! 1. the merge commit's single parent and its build statuses
//! 2. the parent's last staging build, whose `nextBuild` is the change's
//!    first staging attempt
//! 3. forward polling to the first green staging build
//! 4. the acceptance build caused by it, polled forward to green
//! 5. the production build caused by that, polled forward to green
//!
//! Running out of CI history is reported as
//! [`LineageOutcome::InsufficientHistory`], never as an error.

mod poll;

pub use poll::{poll_forward, PollBudget};

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error};

use crate::ci_query;
use crate::config::MetricOptions;
use crate::domain::extract::{entries, field, str_field};
use crate::domain::{
    BuildRecord, HistoryLimit, LineageOutcome, ParentCommit, PullRequest, StageTimestamps,
};
use crate::error::{MetricsError, Result};
use crate::obs;
use crate::registry::ProjectConfig;
use crate::transport::{Target, Transport};

const STATUS_FIELDS: &str = "fields=values.key,values.type,values.state,values.name,values.url";

/// Resolves pull requests of one project to stage timestamps.
pub struct LineageResolver<'a> {
    transport: &'a dyn Transport,
    project: &'a ProjectConfig,
    options: &'a MetricOptions,
}

impl<'a> LineageResolver<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        project: &'a ProjectConfig,
        options: &'a MetricOptions,
    ) -> Self {
        Self {
            transport,
            project,
            options,
        }
    }

    /// Trace one pull request through staging, acceptance and production.
    pub async fn resolve(&self, pr: &PullRequest) -> Result<LineageOutcome> {
        let pr_id = pr.id_label();
        let parent = pr.parent_commit(&self.project.repo_slug)?;
        let display_url = self.parent_build_display_url(&parent).await?;

        if let Some(marker) = &self.options.history_boundary_marker {
            if display_url.contains(marker.as_str()) {
                return Ok(self.history_limit(
                    &pr_id,
                    HistoryLimit::BoundaryMarker { display_url },
                ));
            }
        }

        let first_url = self.first_build_url(&display_url).await?;
        let first_staging = self
            .fetch_build(Target::DirectCi, &ci_query::build_api(&first_url))
            .await?;
        if first_staging.number == 1 {
            return Ok(self.history_limit(&pr_id, HistoryLimit::FirstStagingBuild));
        }
        let staging_build = first_staging.number;
        let staging_identified = first_staging.started_at()?;

        let staging = self
            .poll_forward_until(&self.project.staging_job, first_staging, BuildRecord::is_green)
            .await?;
        debug!(pr_id = %pr_id, build = staging.number, "green staging build");

        let acceptance = match self
            .caused_by(&self.project.acceptance_job, staging.number)
            .await?
        {
            Some(build) if build.number == 1 => {
                return Ok(self.history_limit(&pr_id, HistoryLimit::FirstAcceptanceBuild));
            }
            Some(build) => build,
            None => {
                return Ok(self.history_limit(
                    &pr_id,
                    HistoryLimit::NoAcceptanceBuild {
                        staging_build: staging.number,
                    },
                ));
            }
        };
        let acceptance = self
            .poll_caused_green(&self.project.acceptance_job, acceptance, staging.number)
            .await?;
        debug!(pr_id = %pr_id, build = acceptance.number, "green acceptance build");

        let production = match self
            .caused_by(&self.project.production_job, acceptance.number)
            .await?
        {
            Some(build) => build,
            None => {
                return Ok(self.history_limit(
                    &pr_id,
                    HistoryLimit::NoProductionBuild {
                        acceptance_build: acceptance.number,
                    },
                ));
            }
        };
        let production = self
            .poll_caused_green(&self.project.production_job, production, acceptance.number)
            .await?;
        let production_url = production.url.clone().unwrap_or_else(|| {
            ci_query::build_by_number(&self.project.production_job, production.number)
        });

        let stamps = StageTimestamps {
            staging_build,
            acceptance_build: acceptance.number,
            production_build: production.number,
            staging_identified,
            staging_green: staging.started_at()?,
            production_finished: production.finished_at().map_err(|e| e.at(&production_url))?,
        };
        obs::emit_lineage_resolved(
            &pr_id,
            stamps.staging_build,
            stamps.production_build,
            stamps.lead_time_secs(),
        );
        Ok(LineageOutcome::Resolved(stamps))
    }

    /// Resolve `prs` newest first, stopping at the first history limit.
    ///
    /// Up to `max_concurrency` resolutions run at once; results are consumed
    /// in input order, so nothing at or after the first unresolvable pull
    /// request is kept.
    pub async fn resolve_in_order(&self, prs: &[PullRequest]) -> Result<Vec<StageTimestamps>> {
        let mut outcomes = stream::iter(prs.iter().map(|pr| self.resolve(pr)))
            .buffered(self.options.max_concurrency.max(1));

        let mut resolved = Vec::with_capacity(prs.len());
        while let Some(outcome) = outcomes.next().await {
            match outcome? {
                LineageOutcome::Resolved(stamps) => resolved.push(stamps),
                LineageOutcome::InsufficientHistory(_) => break,
            }
        }
        Ok(resolved)
    }

    fn history_limit(&self, pr_id: &str, limit: HistoryLimit) -> LineageOutcome {
        obs::emit_history_limit(pr_id, &limit);
        LineageOutcome::InsufficientHistory(limit)
    }

    /// Display URL of the first CI status on the parent commit.
    async fn parent_build_display_url(&self, parent: &ParentCommit) -> Result<String> {
        let url = format!("{}?{}", parent.statuses_url, STATUS_FIELDS);
        let data = self.get(Target::DirectScm, &url).await?;
        let values = field(&data, &["values"]).map_err(|e| e.at(&url))?;
        let first = entries(values)
            .into_iter()
            .next()
            .ok_or_else(|| MetricsError::NoBuildStatus {
                hash: parent.hash.clone(),
                repo: self.project.repo_slug.clone(),
                html_url: parent.html_url.clone(),
            })?;
        Ok(str_field(first, &["url"]).map_err(|e| e.at(&url))?.to_string())
    }

    /// URL of the build following the parent's last staging build.
    async fn first_build_url(&self, display_url: &str) -> Result<String> {
        let parent_build = self
            .fetch_build(Target::DirectCi, &ci_query::display_to_api(display_url))
            .await?;
        parent_build
            .next_build_url
            .ok_or_else(|| MetricsError::missing("nextBuild.url").at(display_url))
    }

    async fn poll_forward_until<A>(
        &self,
        job: &str,
        first: BuildRecord,
        accept: A,
    ) -> Result<BuildRecord>
    where
        A: Fn(&BuildRecord) -> bool,
    {
        let number = first.number;
        poll_forward(
            job,
            first,
            number,
            self.options.poll_budget,
            |n| {
                let path = ci_query::build_by_number(job, n);
                async move { self.fetch_build(Target::Ci, &path).await }
            },
            accept,
        )
        .await
    }

    /// Walk forward from `first` to a green build of `job` that `upstream` caused.
    ///
    /// `first` matched the cause filter, so only later builds need their
    /// recorded causes checked.
    async fn poll_caused_green(
        &self,
        job: &str,
        first: BuildRecord,
        upstream: u64,
    ) -> Result<BuildRecord> {
        let first_number = first.number;
        self.poll_forward_until(job, first, |build| {
            build.is_green()
                && (build.number == first_number || build.upstream_builds.contains(&upstream))
        })
        .await
    }

    /// Oldest build of `job` caused by `upstream_build`; `None` when nothing matches.
    async fn caused_by(&self, job: &str, upstream_build: u64) -> Result<Option<BuildRecord>> {
        let path = ci_query::caused_by(job, upstream_build);
        let result = self.transport.request(Target::Ci, &path).await;
        if result.is_status(404) {
            debug!(job = %job, upstream_build, "no build caused by upstream");
            return Ok(None);
        }
        if !result.success {
            error!(path = %path, status = ?result.status_code, "ci request errored out");
        }
        let data = result.into_data(&path)?;
        let mut oldest: Option<BuildRecord> = None;
        for entry in cause_matches(&data) {
            let build = BuildRecord::from_value(entry).map_err(|e| e.at(&path))?;
            if oldest.as_ref().map_or(true, |o| build.number < o.number) {
                oldest = Some(build);
            }
        }
        if oldest.is_none() {
            debug!(job = %job, upstream_build, "no build caused by upstream");
        }
        Ok(oldest)
    }

    async fn fetch_build(&self, target: Target, path: &str) -> Result<BuildRecord> {
        let data = self.get(target, path).await?;
        BuildRecord::from_value(&data).map_err(|e| e.at(path))
    }

    async fn get(&self, target: Target, path: &str) -> Result<Value> {
        debug!(system = target.system(), path = %path, "lineage lookup");
        let result = self.transport.request(target, path).await;
        if !result.success {
            error!(
                system = target.system(),
                path = %path,
                status = ?result.status_code,
                "lineage lookup errored out"
            );
        }
        result.into_data(path)
    }
}

/// Build entries of a cause-filtered response.
///
/// Wrapped responses nest zero or more `build` elements under the wrapper;
/// unwrapped ones are a single `build` root.
fn cause_matches(data: &Value) -> Vec<&Value> {
    if let Some(build) = data.get("build") {
        return entries(build);
    }
    match data.as_object() {
        Some(map) if map.len() == 1 => map
            .values()
            .next()
            .and_then(|wrapper| wrapper.get("build"))
            .map(entries)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
