//! Shared fixtures: scripted SCM and CI responses for one project.

#![allow(dead_code)]

use dora_core::ci_query;
use dora_core::fakes::ScriptedTransport;
use dora_core::{MetricOptions, ProjectConfig, PullRequest, Target};
use serde_json::{json, Value};

pub const CI: &str = "https://ci.example.com";
pub const SCM_API: &str = "https://api.scm.example.com/2.0";

/// 2023-11-14T22:13:20Z
pub const T0: i64 = 1_700_000_000_000;

pub fn project() -> ProjectConfig {
    ProjectConfig {
        project_id: 1,
        staging_job: "st".to_string(),
        acceptance_job: "at".to_string(),
        production_job: "prod".to_string(),
        deployment_job: "deploy".to_string(),
        repo_slug: "repo".to_string(),
    }
}

pub fn options() -> MetricOptions {
    MetricOptions::default()
}

pub fn statuses_url(pr: u64) -> String {
    format!("{}/repositories/ws/repo/commit/p{}/statuses", SCM_API, pr)
}

fn parent(pr: u64) -> Value {
    json!({
        "hash": format!("p{}", pr),
        "links": {
            "html": { "href": format!("https://scm.example.com/ws/repo/commits/p{}", pr) },
            "statuses": { "href": statuses_url(pr) }
        }
    })
}

pub fn pr_json(pr: u64, branch: &str) -> Value {
    json!({
        "id": pr,
        "title": format!("change {}", pr),
        "state": "MERGED",
        "source": { "branch": { "name": branch } },
        "merge_commit": { "hash": format!("m{}", pr), "parents": [parent(pr)] }
    })
}

pub fn pull_request(pr: u64, branch: &str) -> PullRequest {
    PullRequest::new(pr_json(pr, branch))
}

pub fn pull_request_with_parents(pr: u64, parents: usize) -> PullRequest {
    let parents: Vec<Value> = (0..parents).map(|i| parent(pr * 10 + i as u64)).collect();
    PullRequest::new(json!({
        "id": pr,
        "source": { "branch": { "name": "feature/x" } },
        "merge_commit": { "hash": format!("m{}", pr), "parents": parents }
    }))
}

pub fn build_url(job: &str, number: u64) -> String {
    format!("{}/job/{}/{}/", CI, job, number)
}

pub fn display_url(job: &str, number: u64) -> String {
    format!("{}/job/{}/{}/display/redirect", CI, job, number)
}

/// One change's trip through the pipeline.
#[derive(Debug, Clone)]
pub struct Chain {
    pub pr: u64,
    /// Staging build of the parent commit.
    pub parent_build: u64,
    /// Results of staging builds `parent_build + 1`, `+ 2`, ...
    pub staging_results: Vec<&'static str>,
    /// Start of the first staging attempt, epoch ms.
    pub staging_start_ms: i64,
    /// Acceptance build caused by the green staging build.
    pub acceptance: Option<u64>,
    /// Production build caused by the acceptance build: number, start ms, duration ms.
    pub production: Option<(u64, i64, i64)>,
}

impl Chain {
    /// A change whose first staging attempt is green and reaches production.
    pub fn green(pr: u64, parent_build: u64, staging_start_ms: i64, lead_time_ms: i64) -> Self {
        Chain {
            pr,
            parent_build,
            staging_results: vec!["SUCCESS"],
            staging_start_ms,
            acceptance: Some(parent_build + 100),
            production: Some((parent_build + 200, staging_start_ms + lead_time_ms - 60_000, 60_000)),
        }
    }

    pub fn first_staging(&self) -> u64 {
        self.parent_build + 1
    }

    pub fn green_staging(&self) -> Option<u64> {
        self.staging_results
            .iter()
            .position(|r| *r == "SUCCESS")
            .map(|i| self.first_staging() + i as u64)
    }

    /// Add every route this chain needs.
    pub fn script(&self, transport: ScriptedTransport) -> ScriptedTransport {
        let status_query = format!(
            "{}?fields=values.key,values.type,values.state,values.name,values.url",
            statuses_url(self.pr)
        );
        let display = display_url("st", self.parent_build);
        let first = self.first_staging();

        let mut transport = transport
            .ok(
                Target::DirectScm,
                status_query,
                json!({ "values": [{ "key": "k", "state": "SUCCESSFUL", "url": display }] }),
            )
            .ok(
                Target::DirectCi,
                ci_query::display_to_api(&display),
                json!({
                    "number": self.parent_build,
                    "result": "SUCCESS",
                    "timestamp": self.staging_start_ms - 3_600_000,
                    "nextBuild": { "number": first, "url": build_url("st", first) }
                }),
            );

        for (i, result) in self.staging_results.iter().enumerate() {
            let number = first + i as u64;
            let body = json!({
                "number": number,
                "result": result,
                "timestamp": self.staging_start_ms + i as i64 * 60_000,
                "duration": 30_000
            });
            transport = if i == 0 {
                transport.ok(Target::DirectCi, ci_query::build_api(&build_url("st", number)), body)
            } else {
                transport.ok(Target::Ci, ci_query::build_by_number("st", number), body)
            };
        }

        let (Some(staging), Some(acceptance)) = (self.green_staging(), self.acceptance) else {
            return transport;
        };
        transport = transport.ok(
            Target::Ci,
            ci_query::caused_by("at", staging),
            json!({ "builds": { "build": {
                "number": acceptance.to_string(),
                "result": "SUCCESS",
                "timestamp": (self.staging_start_ms + 120_000).to_string()
            }}}),
        );

        if let Some((number, start_ms, duration_ms)) = self.production {
            transport = transport.ok(
                Target::Ci,
                ci_query::caused_by("prod", acceptance),
                json!({ "builds": { "build": {
                    "number": number.to_string(),
                    "result": "SUCCESS",
                    "timestamp": start_ms.to_string(),
                    "duration": duration_ms.to_string()
                }}}),
            );
        }
        transport
    }
}

/// Script the two-step merged pull request listing.
pub fn script_pull_requests(transport: ScriptedTransport, prs: &[Value]) -> ScriptedTransport {
    let base = "/repositories/ws/repo/pullrequests?state=MERGED";
    let page_len = prs.len().min(50);
    let fields = "values.source.branch,values.id,values.title,values.state,\
values.merge_commit.hash,values.merge_commit.date,values.merge_commit.links.self.href,\
values.merge_commit.links.statuses.href,values.merge_commit.parents,\
values.merge_commit.parents.hash,values.merge_commit.parents.date,\
values.merge_commit.parents.links.self.href,values.merge_commit.parents.links.html.href,\
values.merge_commit.parents.links.statuses.href";
    transport
        .ok(
            Target::Scm,
            format!("{}&fields=size", base),
            json!({ "size": prs.len() }),
        )
        .ok(
            Target::Scm,
            format!("{}&pagelen={}&fields={}", base, page_len, fields),
            json!({ "values": prs }),
        )
}
