//! Project registry: maps a 1-based project id onto its CI jobs and repository.

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Lowest valid project id.
pub const MIN_PROJECT_ID: i64 = 1;

/// The correlated identifiers of one project.
///
/// Built fresh for every request and passed by reference; never shared as
/// mutable process state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project_id: i64,
    /// CI job that builds every merged commit (staging).
    pub staging_job: String,
    /// CI job triggered by a green staging build (acceptance / auto-test).
    pub acceptance_job: String,
    /// CI job triggered by a green acceptance build (production).
    pub production_job: String,
    /// CI job whose green builds count as deployments.
    pub deployment_job: String,
    /// SCM repository slug.
    pub repo_slug: String,
}

/// Parallel name lists, each padded with an empty placeholder at index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRegistry {
    staging_jobs: Vec<String>,
    acceptance_jobs: Vec<String>,
    production_jobs: Vec<String>,
    deployment_jobs: Vec<String>,
    repo_slugs: Vec<String>,
}

fn padded(list: &str) -> Vec<String> {
    std::iter::once(String::new())
        .chain(list.split(',').map(|name| name.trim().to_string()))
        .collect()
}

impl ProjectRegistry {
    /// Build a registry from five comma-separated name lists.
    pub fn from_lists(
        staging: &str,
        acceptance: &str,
        production: &str,
        deployment: &str,
        repos: &str,
    ) -> Self {
        ProjectRegistry {
            staging_jobs: padded(staging),
            acceptance_jobs: padded(acceptance),
            production_jobs: padded(production),
            deployment_jobs: padded(deployment),
            repo_slugs: padded(repos),
        }
    }

    /// Check that the lists describe a usable configuration.
    pub fn validate(&self) -> Result<()> {
        let lengths = [
            self.staging_jobs.len(),
            self.acceptance_jobs.len(),
            self.production_jobs.len(),
            self.deployment_jobs.len(),
            self.repo_slugs.len(),
        ];
        if lengths.windows(2).any(|pair| pair[0] != pair[1]) {
            return Err(MetricsError::Misconfigured(
                "The job name env vars do not match. Environment variables need fixed before requests can be accepted.".to_string(),
            ));
        }
        if self.deployment_jobs.len() == 2 && self.deployment_jobs[1].is_empty() {
            return Err(MetricsError::Misconfigured(
                "Invalid job name env vars. Values are empty. Environment variables need fixed before requests can be accepted".to_string(),
            ));
        }
        Ok(())
    }

    /// Highest valid project id.
    pub fn max_project_id(&self) -> i64 {
        self.deployment_jobs.len() as i64 - 1
    }

    /// Validate the configuration and select one project.
    pub fn resolve(&self, project_id: i64) -> Result<ProjectConfig> {
        self.validate()?;
        if project_id < MIN_PROJECT_ID || project_id > self.max_project_id() {
            return Err(MetricsError::InvalidProject { project_id });
        }
        let index = project_id as usize;
        Ok(ProjectConfig {
            project_id,
            staging_job: self.staging_jobs[index].clone(),
            acceptance_job: self.acceptance_jobs[index].clone(),
            production_job: self.production_jobs[index].clone(),
            deployment_job: self.deployment_jobs[index].clone(),
            repo_slug: self.repo_slugs[index].clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    fn three_projects() -> ProjectRegistry {
        ProjectRegistry::from_lists(
            "st-a,st-b,st-c",
            "at-a,at-b,at-c",
            "pr-a,pr-b,pr-c",
            "dep-a,dep-b,dep-c",
            "repo-a,repo-b,repo-c",
        )
    }

    #[test]
    fn test_resolve_selects_one_based_entry() {
        let config = three_projects().resolve(2).unwrap();
        assert_eq!(config.project_id, 2);
        assert_eq!(config.staging_job, "st-b");
        assert_eq!(config.acceptance_job, "at-b");
        assert_eq!(config.production_job, "pr-b");
        assert_eq!(config.deployment_job, "dep-b");
        assert_eq!(config.repo_slug, "repo-b");
    }

    #[test]
    fn test_out_of_range_ids_are_client_errors() {
        let registry = three_projects();
        for id in [0, 4, -1] {
            let err = registry.resolve(id).unwrap_err();
            assert_eq!(err.class(), ErrorClass::Client, "id {} should be rejected", id);
        }
        assert!(registry.resolve(3).is_ok());
    }

    #[test]
    fn test_mismatched_lengths_are_misconfigured() {
        let registry = ProjectRegistry::from_lists("a,b", "a,b", "a,b", "a", "a,b");
        let err = registry.resolve(1).unwrap_err();
        assert!(matches!(err, MetricsError::Misconfigured(_)));
        assert_eq!(err.class(), ErrorClass::Server);
    }

    #[test]
    fn test_empty_lists_are_misconfigured() {
        let registry = ProjectRegistry::from_lists("", "", "", "", "");
        assert!(matches!(
            registry.validate(),
            Err(MetricsError::Misconfigured(_))
        ));
    }

    #[test]
    fn test_each_resolution_is_independent() {
        let registry = three_projects();
        let first = registry.resolve(1).unwrap();
        let third = registry.resolve(3).unwrap();
        assert_eq!(first.repo_slug, "repo-a");
        assert_eq!(third.repo_slug, "repo-c");
        assert_eq!(registry.resolve(1).unwrap(), first);
    }
}
