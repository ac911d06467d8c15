//! Per-PR lineage results.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why the lineage chain could not be extended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum HistoryLimit {
    /// The first staging build of the change is build #1.
    FirstStagingBuild,
    /// The first acceptance build of the change is build #1.
    FirstAcceptanceBuild,
    /// No acceptance build records the staging build as its cause.
    NoAcceptanceBuild { staging_build: u64 },
    /// No production build records the acceptance build as its cause.
    NoProductionBuild { acceptance_build: u64 },
    /// The parent commit was built outside the tracked job.
    BoundaryMarker { display_url: String },
}

/// Timestamps of one change through the three deployment stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTimestamps {
    /// First-attempt staging build for the change.
    pub staging_build: u64,
    /// Green acceptance build used for the production lookup.
    pub acceptance_build: u64,
    /// Green production build.
    pub production_build: u64,
    /// Start of the first-attempt staging build; lead time starts here.
    pub staging_identified: DateTime<Utc>,
    /// Start of the first green staging build.
    pub staging_green: DateTime<Utc>,
    /// Production build start plus duration.
    pub production_finished: DateTime<Utc>,
}

impl StageTimestamps {
    /// Seconds from first staging attempt to production completion.
    pub fn lead_time_secs(&self) -> i64 {
        (self.production_finished - self.staging_identified).num_seconds()
    }
}

/// Outcome of resolving one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum LineageOutcome {
    Resolved(StageTimestamps),
    /// Terminal: older pull requests cannot be resolved either.
    InsufficientHistory(HistoryLimit),
}

impl LineageOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, LineageOutcome::Resolved(_))
    }

    pub fn timestamps(&self) -> Option<&StageTimestamps> {
        match self {
            LineageOutcome::Resolved(stamps) => Some(stamps),
            LineageOutcome::InsufficientHistory(_) => None,
        }
    }
}
