//! Error taxonomy for metric computation.
//!
//! Every failure is either caused by the caller (`ErrorClass::Client`) or by
//! the environment and upstream systems (`ErrorClass::Server`). Running out of
//! CI history is not an error at all; see [`crate::domain::LineageOutcome`].

use thiserror::Error;

/// Message used when an upstream failure carries no body text.
pub const UPSTREAM_FALLBACK_MESSAGE: &str = "Error: a problem occured";

/// Who is responsible for a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request cannot be fulfilled as specified. Never retried.
    Client,
    /// Upstream data, transport or environment failure.
    Server,
}

/// Errors produced while resolving lineage or calculating metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Project id outside the configured range.
    #[error("Out of Bounds Request ID: {project_id}")]
    InvalidProject { project_id: i64 },

    /// The environment is not configured well enough to serve requests.
    #[error("misconfigured environment: {0}")]
    Misconfigured(String),

    /// A required key was absent from an upstream response.
    #[error("Key '{field}' cannot be found in the response{}", url_suffix(.url))]
    MissingField { field: String, url: Option<String> },

    /// A merge commit whose parent list is not exactly one entry long.
    #[error("Unexpected number of merge commit parents ({count}) for PR {pr_id} in {repo}")]
    UnexpectedParents {
        pr_id: String,
        repo: String,
        count: usize,
    },

    /// The parent commit has no CI build status to start the walk from.
    #[error("Unexpected number of builds for commit {hash} in {repo}. Visit {html_url}")]
    NoBuildStatus {
        hash: String,
        repo: String,
        html_url: String,
    },

    /// An upstream response had the keys but not the expected shape.
    #[error("Unexpected data from {context}{}", url_suffix(.url))]
    UnexpectedShape { context: String, url: Option<String> },

    /// Network failure or non-2xx answer from the CI server or SCM host.
    #[error("{message}")]
    Upstream {
        status: Option<u16>,
        message: String,
        url: String,
    },

    /// The data does not describe a valid measurement window.
    #[error("{0}")]
    InvalidMeasurement(String),

    /// The retry-until-green loop ran out of budget.
    #[error("no green build in job {job} within {attempts} builds after #{from}")]
    PollingExhausted { job: String, from: u64, attempts: u32 },

    /// The invocation exceeded its wall-clock budget.
    #[error("metric computation timed out after {secs} seconds")]
    Timeout { secs: u64 },
}

fn url_suffix(url: &Option<String>) -> String {
    match url {
        Some(url) => format!(". Visit {}", url),
        None => String::new(),
    }
}

impl MetricsError {
    /// Build a missing-field error without URL context.
    pub fn missing(field: impl Into<String>) -> Self {
        MetricsError::MissingField {
            field: field.into(),
            url: None,
        }
    }

    /// Attach the URL that produced the response, if not already set.
    pub fn at(self, source_url: &str) -> Self {
        match self {
            MetricsError::MissingField { field, url: None } => MetricsError::MissingField {
                field,
                url: Some(source_url.to_string()),
            },
            MetricsError::UnexpectedShape { context, url: None } => {
                MetricsError::UnexpectedShape {
                    context,
                    url: Some(source_url.to_string()),
                }
            }
            other => other,
        }
    }

    /// Classify the error for the boundary layer.
    pub fn class(&self) -> ErrorClass {
        match self {
            MetricsError::InvalidProject { .. } => ErrorClass::Client,
            _ => ErrorClass::Server,
        }
    }

    /// HTTP-style status code for the boundary layer.
    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::Client => 422,
            ErrorClass::Server => 500,
        }
    }
}

/// Result type for metric operations.
pub type Result<T> = std::result::Result<T, MetricsError>;
