//! In-memory fakes for the transport trait (testing only)
//!
//! `ScriptedTransport` answers requests from a table keyed by
//! `(Target, path)` and records every call it receives, so tests can assert
//! both on results and on the exact lookup chain.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::{RequestResult, Target, Transport};

/// Transport answering from a fixed script.
///
/// Unscripted requests get a 404 whose body names the missing route.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Target, String), RequestResult>>,
    calls: Mutex<Vec<(Target, String)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with a 200 and `data`.
    pub fn ok(self, target: Target, path: impl Into<String>, data: Value) -> Self {
        self.respond(target, path, RequestResult::ok(200, data))
    }

    /// Answer `path` with an arbitrary envelope.
    pub fn respond(self, target: Target, path: impl Into<String>, result: RequestResult) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((target, path.into()), result);
        self
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<(Target, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, target: Target, path: &str) -> RequestResult {
        // keep the same fail-fast contract as the real transport
        let _ = target.url("", path);
        self.calls
            .lock()
            .unwrap()
            .push((target, path.to_string()));
        self.routes
            .lock()
            .unwrap()
            .get(&(target, path.to_string()))
            .cloned()
            .unwrap_or_else(|| {
                RequestResult::http_error(404, format!("no scripted response for {}", path))
            })
    }
}
