//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error};

use super::{xml, RequestResult, Target, Transport};
use crate::config::{Endpoint, Settings};
use crate::error::{MetricsError, Result};

/// HTTP client for the CI server and the SCM host.
pub struct HttpTransport {
    ci: Endpoint,
    scm: Endpoint,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a per-request timeout.
    pub fn new(ci: Endpoint, scm: Endpoint, request_timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("dora-core/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|e| MetricsError::Misconfigured(format!("failed to create HTTP client: {}", e)))?;

        Ok(HttpTransport {
            ci,
            scm,
            http_client,
        })
    }

    /// Create a transport from loaded settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.ci.clone(),
            settings.scm.clone(),
            settings.request_timeout,
        )
    }

    fn endpoint(&self, target: Target) -> &Endpoint {
        if target.is_ci() {
            &self.ci
        } else {
            &self.scm
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, target: Target, path: &str) -> RequestResult {
        let endpoint = self.endpoint(target);
        let url = target.url(&endpoint.base_url, path);

        let mut request = self.http_client.get(&url);
        if let Some(username) = &endpoint.username {
            request = request.basic_auth(username, endpoint.secret.as_deref());
        }

        debug!(system = target.system(), url = %url, "sending upstream request");

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                error!(system = target.system(), url = %url, error = %err, "upstream request failed");
                return RequestResult::network_failure();
            }
        };

        let status = response.status();
        let is_xml = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|content_type| content_type.contains("xml"))
            .unwrap_or(false);

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                error!(url = %url, error = %err, "failed to read upstream body");
                return RequestResult::decode_failure(status.as_u16());
            }
        };

        if !status.is_success() {
            error!(
                system = target.system(),
                url = %url,
                status = status.as_u16(),
                "upstream returned an error status"
            );
            return RequestResult::http_error(status.as_u16(), body);
        }

        let decoded = if is_xml {
            xml::to_value(&body)
        } else {
            serde_json::from_str(&body).map_err(|e| e.to_string())
        };

        match decoded {
            Ok(data) => {
                debug!(url = %url, status = status.as_u16(), "upstream request succeeded");
                RequestResult::ok(status.as_u16(), data)
            }
            Err(err) => {
                error!(url = %url, error = %err, "failed to decode upstream body");
                RequestResult::decode_failure(status.as_u16())
            }
        }
    }
}
