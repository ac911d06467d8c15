//! Environment-driven configuration.
//!
//! Settings are read once per invocation and passed down explicitly; nothing
//! here is stored in process-wide mutable state.

use std::time::Duration;

use crate::error::{MetricsError, Result};
use crate::lineage::PollBudget;
use crate::registry::ProjectRegistry;

/// Endpoint and credentials for one upstream system.
#[derive(Debug, Clone, Default)]
pub struct Endpoint {
    /// Base URL that templated paths are appended to.
    pub base_url: String,
    /// Basic-auth username (optional).
    pub username: Option<String>,
    /// Basic-auth password or app token (optional).
    pub secret: Option<String>,
}

impl Endpoint {
    pub fn new(base_url: &str) -> Self {
        Endpoint {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: None,
            secret: None,
        }
    }

    /// Set basic-auth credentials.
    pub fn with_credentials(mut self, username: &str, secret: &str) -> Self {
        self.username = Some(username.to_string());
        self.secret = Some(secret.to_string());
        self
    }
}

/// Knobs that bound and shape a single metric computation.
#[derive(Debug, Clone)]
pub struct MetricOptions {
    /// Cap for every retry-until-green loop.
    pub poll_budget: PollBudget,
    /// Source branch substring that marks a hotfix PR.
    pub hotfix_marker: String,
    /// Display-URL substring that marks the end of usable history.
    pub history_boundary_marker: Option<String>,
    /// Pull request resolutions allowed in flight at once.
    pub max_concurrency: usize,
    /// Sub-job selected from multibranch build listings.
    pub default_branch_job: String,
    /// Wall-clock budget for one invocation.
    pub invocation_timeout: Duration,
}

impl Default for MetricOptions {
    fn default() -> Self {
        MetricOptions {
            poll_budget: PollBudget::default(),
            hotfix_marker: "hotfix".to_string(),
            history_boundary_marker: None,
            max_concurrency: 1,
            default_branch_job: "main".to_string(),
            invocation_timeout: Duration::from_secs(300),
        }
    }
}

/// Everything an invocation needs, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ci: Endpoint,
    pub scm: Endpoint,
    /// SCM workspace (owner) the repository slugs live under.
    pub scm_workspace: String,
    pub request_timeout: Duration,
    pub options: MetricOptions,
    pub registry: ProjectRegistry,
}

impl Settings {
    /// Load settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let mut ci = Endpoint::new(&get("DORA_CI_API_URL", "http://localhost:8080"));
        if let (Some(user), Some(token)) = (lookup("DORA_CI_USERNAME"), lookup("DORA_CI_API_TOKEN"))
        {
            ci = ci.with_credentials(&user, &token);
        }

        let mut scm = Endpoint::new(&get("DORA_SCM_API_URL", "https://api.bitbucket.org/2.0"));
        if let (Some(user), Some(password)) = (
            lookup("DORA_SCM_USERNAME"),
            lookup("DORA_SCM_APP_PASSWORD"),
        ) {
            scm = scm.with_credentials(&user, &password);
        }

        let registry = ProjectRegistry::from_lists(
            &get("DORA_STAGING_JOB_NAMES", ""),
            &get("DORA_ACCEPTANCE_JOB_NAMES", ""),
            &get("DORA_PRODUCTION_JOB_NAMES", ""),
            &get("DORA_DEPLOYMENT_JOB_NAMES", ""),
            &get("DORA_REPO_SLUGS", ""),
        );

        let defaults = MetricOptions::default();
        let options = MetricOptions {
            poll_budget: PollBudget {
                max_polls: parse_number(&lookup, "DORA_MAX_POLLS", defaults.poll_budget.max_polls)?,
                interval: Duration::from_millis(parse_number(
                    &lookup,
                    "DORA_POLL_INTERVAL_MS",
                    0u64,
                )?),
            },
            hotfix_marker: get("DORA_HOTFIX_MARKER", &defaults.hotfix_marker),
            history_boundary_marker: lookup("DORA_HISTORY_BOUNDARY_MARKER")
                .filter(|marker| !marker.is_empty()),
            max_concurrency: parse_number(&lookup, "DORA_MAX_CONCURRENCY", 1usize)?.max(1),
            default_branch_job: get("DORA_DEFAULT_BRANCH_JOB", &defaults.default_branch_job),
            invocation_timeout: Duration::from_secs(parse_number(
                &lookup,
                "DORA_INVOCATION_TIMEOUT_SECS",
                defaults.invocation_timeout.as_secs(),
            )?),
        };

        Ok(Settings {
            ci,
            scm,
            scm_workspace: get("DORA_SCM_WORKSPACE", "workspace"),
            request_timeout: Duration::from_secs(parse_number(
                &lookup,
                "DORA_REQUEST_TIMEOUT_SECS",
                30u64,
            )?),
            options,
            registry,
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            MetricsError::Misconfigured(format!("{} must be a number, got '{}'", key, raw))
        }),
    }
}
