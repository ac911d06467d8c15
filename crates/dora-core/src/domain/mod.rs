//! Domain records read from the CI server and the SCM host.

pub mod build;
pub mod extract;
pub mod lineage;
pub mod pull_request;

pub use build::{parse_build_list, BuildRecord, BuildResult};
pub use lineage::{HistoryLimit, LineageOutcome, StageTimestamps};
pub use pull_request::{ParentCommit, PullRequest};
