//! Transport adapter for the CI server and the SCM host.
//!
//! All upstream traffic goes through the [`Transport`] trait, which never
//! fails: failures are reported inside the [`RequestResult`] envelope so the
//! caller decides how to classify them.

pub mod http;
pub mod xml;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{MetricsError, Result, UPSTREAM_FALLBACK_MESSAGE};

pub use http::HttpTransport;

/// Addressing mode of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// CI base URL + path.
    Ci,
    /// SCM base URL + path.
    Scm,
    /// Absolute CI URL taken from a previous response.
    DirectCi,
    /// Absolute SCM URL taken from a previous response.
    DirectScm,
}

impl Target {
    /// Whether the path is already an absolute URL.
    pub fn is_direct(&self) -> bool {
        matches!(self, Target::DirectCi | Target::DirectScm)
    }

    /// Whether the request goes to the CI server.
    pub fn is_ci(&self) -> bool {
        matches!(self, Target::Ci | Target::DirectCi)
    }

    /// Short upstream name used in logs.
    pub fn system(&self) -> &'static str {
        if self.is_ci() {
            "ci"
        } else {
            "scm"
        }
    }

    /// Full URL for `path` against `base_url`.
    ///
    /// # Panics
    ///
    /// Panics when a templated target is given a path without a leading `/`;
    /// that is a bug in the caller, not an upstream condition.
    pub fn url(&self, base_url: &str, path: &str) -> String {
        if self.is_direct() {
            return path.to_string();
        }
        assert!(
            path.starts_with('/'),
            "invalid path for {:?} request: {:?} must start with '/'",
            self,
            path
        );
        format!("{}{}", base_url, path)
    }
}

/// Uniform result envelope for one upstream request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestResult {
    pub success: bool,
    /// Absent only when the request never got an HTTP response.
    pub status_code: Option<u16>,
    /// Decoded body on success.
    pub data: Option<Value>,
    /// Raw body text on an HTTP error.
    pub message: Option<String>,
}

impl RequestResult {
    /// 2xx with a decoded body.
    pub fn ok(status_code: u16, data: Value) -> Self {
        RequestResult {
            success: true,
            status_code: Some(status_code),
            data: Some(data),
            message: None,
        }
    }

    /// Non-2xx answer.
    pub fn http_error(status_code: u16, body: impl Into<String>) -> Self {
        RequestResult {
            success: false,
            status_code: Some(status_code),
            data: None,
            message: Some(body.into()),
        }
    }

    /// A 2xx answer whose body could not be decoded.
    pub fn decode_failure(status_code: u16) -> Self {
        RequestResult {
            success: false,
            status_code: Some(status_code),
            data: None,
            message: None,
        }
    }

    /// No HTTP response at all.
    pub fn network_failure() -> Self {
        RequestResult {
            success: false,
            status_code: None,
            data: None,
            message: None,
        }
    }

    /// Whether the upstream answered with this status code.
    pub fn is_status(&self, code: u16) -> bool {
        self.status_code == Some(code)
    }

    /// Take the decoded body, turning any failure into a server error.
    pub fn into_data(self, url: &str) -> Result<Value> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(MetricsError::Upstream {
                status: self.status_code,
                message: self
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| UPSTREAM_FALLBACK_MESSAGE.to_string()),
                url: url.to_string(),
            }),
        }
    }
}

/// GET-only access to both upstream systems.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET for `path` under the addressing mode `target`.
    async fn request(&self, target: Target, path: &str) -> RequestResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_templated_url_joins_base() {
        assert_eq!(
            Target::Ci.url("https://ci.example.com", "/job/st/api/json"),
            "https://ci.example.com/job/st/api/json"
        );
    }

    #[test]
    fn test_direct_url_is_used_verbatim() {
        let url = "https://scm.example.com/2.0/repositories/a/b/commit/abc/statuses";
        assert_eq!(Target::DirectScm.url("https://ignored", url), url);
    }

    #[test]
    #[should_panic(expected = "must start with '/'")]
    fn test_templated_path_without_slash_panics() {
        Target::Scm.url("https://scm.example.com", "repositories/a/b");
    }

    #[test]
    fn test_into_data_success() {
        let result = RequestResult::ok(200, json!({ "size": 3 }));
        assert_eq!(result.into_data("u").unwrap()["size"], 3);
    }

    #[test]
    fn test_into_data_uses_body_text_as_message() {
        let err = RequestResult::http_error(503, "maintenance")
            .into_data("https://ci.example.com/x")
            .unwrap_err();
        match err {
            MetricsError::Upstream {
                status,
                message,
                url,
            } => {
                assert_eq!(status, Some(503));
                assert_eq!(message, "maintenance");
                assert_eq!(url, "https://ci.example.com/x");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_network_failure_has_no_status() {
        let result = RequestResult::network_failure();
        assert!(!result.success);
        assert!(result.status_code.is_none());
        let err = result.into_data("u").unwrap_err();
        assert_eq!(err.to_string(), UPSTREAM_FALLBACK_MESSAGE);
    }
}
