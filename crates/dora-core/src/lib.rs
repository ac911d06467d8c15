//! DORA Core Library
//!
//! Computes delivery metrics by correlating merged pull requests on the SCM
//! host with the builds they triggered on the CI server.
//!
//! ## Layers
//!
//! - `transport`: GET-only access to both upstream systems
//! - `lineage`: per-PR stage timestamps through staging, acceptance and production
//! - `metrics`: deployment frequency, lead time, recovery time, change failure rate
//! - `registry` and `config`: per-invocation project and policy settings

pub mod ci_query;
pub mod config;
pub mod domain;
pub mod duration;
mod error;
pub mod fakes;
pub mod lineage;
pub mod metrics;
pub mod obs;
pub mod registry;
pub mod scm;
pub mod telemetry;
pub mod transport;

pub use error::{ErrorClass, MetricsError, Result, UPSTREAM_FALLBACK_MESSAGE};

pub use config::{Endpoint, MetricOptions, Settings};

pub use domain::{
    BuildRecord, BuildResult, HistoryLimit, LineageOutcome, ParentCommit, PullRequest,
    StageTimestamps,
};

pub use lineage::{poll_forward, LineageResolver, PollBudget};

pub use metrics::{run_metric, MetricContext, MetricKind, MetricReport};

pub use registry::{ProjectConfig, ProjectRegistry};

pub use scm::PullRequestSource;

pub use transport::{HttpTransport, RequestResult, Target, Transport};
