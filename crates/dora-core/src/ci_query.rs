//! Path construction for CI server queries.
//!
//! All CI-specific query syntax lives here; the resolver and calculators only
//! ask for "the build list", "build N" or "builds caused by build N".

/// Fields requested for a single build.
pub const BUILD_TREE: &str = "displayName,number,id,fullDisplayName,result,duration,timestamp,url,\
inProgress,nextBuild[number,url],actions[causes[upstreamBuild]]";

/// Fields requested for a job's build list.
///
/// Plain jobs answer with `allBuilds`, multibranch jobs with `jobs`; the CI
/// server drops tree attributes a job does not have.
pub const BUILD_LIST_TREE: &str = "allBuilds[number,result,timestamp,duration,url],\
jobs[name,builds[number,result,timestamp,duration,url]]";

/// Fields requested for cause-filtered builds.
pub const CAUSE_TREE: &str =
    "builds[number,result,duration,timestamp,url,actions[causes[upstreamUrl,upstreamBuild]]]";

const DISPLAY_SUFFIX: &str = "/display/redirect";

/// Path of a job under the CI base URL.
///
/// Names that already start with `/` are taken as complete paths, so folder
/// jobs can be configured as `/job/team/job/app`.
pub fn job_path(job: &str) -> String {
    if job.starts_with('/') {
        job.trim_end_matches('/').to_string()
    } else {
        format!("/job/{}", job)
    }
}

/// All builds of a job.
pub fn build_list(job: &str) -> String {
    format!("{}/api/json?tree={}", job_path(job), BUILD_LIST_TREE)
}

/// One build of a job by number.
pub fn build_by_number(job: &str, number: u64) -> String {
    format!("{}/{}/api/json?tree={}", job_path(job), number, BUILD_TREE)
}

/// Rewrite a status display URL into the build's API URL.
pub fn display_to_api(display_url: &str) -> String {
    display_url.replacen(DISPLAY_SUFFIX, &format!("/api/json?tree={}", BUILD_TREE), 1)
}

/// API URL of an absolute build URL.
pub fn build_api(build_url: &str) -> String {
    let separator = if build_url.ends_with('/') { "" } else { "/" };
    format!("{}{}api/json?tree={}", build_url, separator, BUILD_TREE)
}

/// Builds of `job` that record `upstream_build` as their cause.
///
/// Matches come back wrapped in a `builds` element, newest first, so several
/// matches are not rejected. Older servers answer 404 when nothing matches.
pub fn caused_by(job: &str, upstream_build: u64) -> String {
    format!(
        "{}/api/xml?tree={}&xpath=/workflowJob/build/action/cause[upstreamBuild%20=%20%27{}%27]/../..&wrapper=builds",
        job_path(job),
        CAUSE_TREE,
        upstream_build
    )
}
