//! Merged pull requests as returned by the SCM host.

use serde_json::Value;

use super::extract::{field, str_field};
use crate::error::{MetricsError, Result};

/// The single parent of a pull request's merge commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentCommit {
    pub hash: String,
    /// Human-facing commit page, used in diagnostics.
    pub html_url: String,
    /// Build statuses endpoint for the commit.
    pub statuses_url: String,
}

/// One merged pull request.
///
/// Kept as the raw upstream record; fields are read lazily so a missing key
/// only fails the calculation that needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    raw: Value,
}

impl PullRequest {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// Numeric id, when present.
    pub fn id(&self) -> Option<u64> {
        self.raw.get("id").and_then(Value::as_u64)
    }

    /// Id for log and error messages.
    pub fn id_label(&self) -> String {
        match self.raw.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => "None".to_string(),
        }
    }

    pub fn source_branch(&self) -> Result<&str> {
        str_field(&self.raw, &["source", "branch", "name"])
    }

    /// Whether the source branch name contains `marker`.
    pub fn is_hotfix(&self, marker: &str) -> Result<bool> {
        Ok(self.source_branch()?.contains(marker))
    }

    /// Read the merge commit's only parent.
    ///
    /// Zero or several parents is an error: the lineage walk needs exactly
    /// one predecessor to start from.
    pub fn parent_commit(&self, repo: &str) -> Result<ParentCommit> {
        let parents = field(&self.raw, &["merge_commit", "parents"])?;
        let parents = parents.as_array().ok_or_else(|| MetricsError::UnexpectedShape {
            context: format!("merge commit parents of PR {}", self.id_label()),
            url: None,
        })?;

        let parent = match parents.as_slice() {
            [parent] => parent,
            _ => {
                return Err(MetricsError::UnexpectedParents {
                    pr_id: self.id_label(),
                    repo: repo.to_string(),
                    count: parents.len(),
                })
            }
        };

        Ok(ParentCommit {
            hash: str_field(parent, &["hash"])?.to_string(),
            html_url: str_field(parent, &["links", "html", "href"])?.to_string(),
            statuses_url: str_field(parent, &["links", "statuses", "href"])?.to_string(),
        })
    }
}

impl From<Value> for PullRequest {
    fn from(raw: Value) -> Self {
        PullRequest::new(raw)
    }
}
