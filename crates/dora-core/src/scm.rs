//! Merged pull request retrieval from the SCM host.

use serde_json::Value;
use tracing::{debug, error};

use crate::domain::extract::{field, u64_field};
use crate::domain::PullRequest;
use crate::error::{MetricsError, Result};
use crate::transport::{Target, Transport};

/// Upper bound on the page length the SCM host accepts.
pub const MAX_PAGE_LEN: u64 = 50;

const PULL_REQUEST_FIELDS: &str = "values.source.branch,values.id,values.title,values.state,\
values.merge_commit.hash,values.merge_commit.date,values.merge_commit.links.self.href,\
values.merge_commit.links.statuses.href,values.merge_commit.parents,\
values.merge_commit.parents.hash,values.merge_commit.parents.date,\
values.merge_commit.parents.links.self.href,values.merge_commit.parents.links.html.href,\
values.merge_commit.parents.links.statuses.href";

/// Merged pull requests of one repository, newest first.
pub struct PullRequestSource<'a> {
    transport: &'a dyn Transport,
    workspace: &'a str,
    repo_slug: &'a str,
}

impl<'a> PullRequestSource<'a> {
    pub fn new(transport: &'a dyn Transport, workspace: &'a str, repo_slug: &'a str) -> Self {
        Self {
            transport,
            workspace,
            repo_slug,
        }
    }

    fn base_path(&self) -> String {
        format!(
            "/repositories/{}/{}/pullrequests?state=MERGED",
            self.workspace, self.repo_slug
        )
    }

    /// Total number of merged pull requests.
    pub async fn count(&self) -> Result<u64> {
        let path = format!("{}&fields=size", self.base_path());
        let data = self.get(&path).await?;
        u64_field(&data, &["size"]).map_err(|e| e.at(&path))
    }

    /// Fetch up to [`MAX_PAGE_LEN`] merged pull requests.
    pub async fn merged(&self) -> Result<Vec<PullRequest>> {
        let count = self.count().await?;
        if count == 0 {
            debug!(repo = %self.repo_slug, "no merged pull requests");
            return Ok(Vec::new());
        }

        let page_len = count.min(MAX_PAGE_LEN);
        let path = format!(
            "{}&pagelen={}&fields={}",
            self.base_path(),
            page_len,
            PULL_REQUEST_FIELDS
        );
        let data = self.get(&path).await?;
        let values = field(&data, &["values"]).map_err(|e| e.at(&path))?;
        let values = values.as_array().ok_or_else(|| MetricsError::UnexpectedShape {
            context: format!("pull requests of {}", self.repo_slug),
            url: Some(path.clone()),
        })?;

        debug!(repo = %self.repo_slug, count = values.len(), "fetched merged pull requests");
        Ok(values.iter().cloned().map(PullRequest::new).collect())
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let result = self.transport.request(Target::Scm, path).await;
        if !result.success {
            error!(path = %path, status = ?result.status_code, "scm request errored out");
        }
        result.into_data(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedTransport;
    use crate::transport::RequestResult;
    use serde_json::json;

    const COUNT_PATH: &str = "/repositories/ws/repo/pullrequests?state=MERGED&fields=size";

    fn page_path(len: u64) -> String {
        format!(
            "/repositories/ws/repo/pullrequests?state=MERGED&pagelen={}&fields={}",
            len, PULL_REQUEST_FIELDS
        )
    }

    #[tokio::test]
    async fn test_zero_count_skips_second_request() {
        let transport = ScriptedTransport::new().ok(Target::Scm, COUNT_PATH, json!({ "size": 0 }));
        let source = PullRequestSource::new(&transport, "ws", "repo");
        assert!(source.merged().await.unwrap().is_empty());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_page_length_is_capped() {
        let transport = ScriptedTransport::new()
            .ok(Target::Scm, COUNT_PATH, json!({ "size": 230 }))
            .ok(
                Target::Scm,
                page_path(50),
                json!({ "values": [{ "id": 3 }, { "id": 2 }] }),
            );
        let source = PullRequestSource::new(&transport, "ws", "repo");
        let prs = source.merged().await.unwrap();
        assert_eq!(prs.len(), 2);
        assert_eq!(prs[0].id(), Some(3));
    }

    #[tokio::test]
    async fn test_small_count_is_used_as_page_length() {
        let transport = ScriptedTransport::new()
            .ok(Target::Scm, COUNT_PATH, json!({ "size": 2 }))
            .ok(Target::Scm, page_path(2), json!({ "values": [] }));
        let source = PullRequestSource::new(&transport, "ws", "repo");
        assert!(source.merged().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_size_is_server_error() {
        let transport = ScriptedTransport::new().ok(Target::Scm, COUNT_PATH, json!({}));
        let source = PullRequestSource::new(&transport, "ws", "repo");
        let err = source.count().await.unwrap_err();
        assert!(err.to_string().contains("'size'"));
        assert!(err.to_string().contains(COUNT_PATH));
    }

    #[tokio::test]
    async fn test_upstream_failure_carries_message() {
        let transport = ScriptedTransport::new().respond(
            Target::Scm,
            COUNT_PATH,
            RequestResult::http_error(401, "Unauthorized"),
        );
        let source = PullRequestSource::new(&transport, "ws", "repo");
        let err = source.merged().await.unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized");
    }
}
