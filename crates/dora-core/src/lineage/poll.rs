//! Bounded retry-until-green polling over increasing build numbers.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{MetricsError, Result};

/// Cap on one polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    /// Builds fetched past the first one before giving up.
    pub max_polls: u32,
    /// Pause between fetches.
    pub interval: Duration,
}

impl Default for PollBudget {
    fn default() -> Self {
        PollBudget {
            max_polls: 25,
            interval: Duration::ZERO,
        }
    }
}

/// Walk forward from `first` until `accept` holds.
///
/// `first` is build `first_number` of `job`. When it is not accepted, builds
/// `first_number + 1`, `first_number + 2`, ... are fetched through
/// `fetch_by_number` until one is accepted or the budget runs out.
pub async fn poll_forward<T, F, Fut, A>(
    job: &str,
    first: T,
    first_number: u64,
    budget: PollBudget,
    mut fetch_by_number: F,
    accept: A,
) -> Result<T>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<T>>,
    A: Fn(&T) -> bool,
{
    if accept(&first) {
        return Ok(first);
    }

    for attempt in 1..=budget.max_polls {
        if !budget.interval.is_zero() {
            tokio::time::sleep(budget.interval).await;
        }
        let number = first_number + u64::from(attempt);
        debug!(job = %job, number, attempt, "polling next build");
        let candidate = fetch_by_number(number).await?;
        if accept(&candidate) {
            return Ok(candidate);
        }
    }

    Err(MetricsError::PollingExhausted {
        job: job.to_string(),
        from: first_number,
        attempts: budget.max_polls,
    })
}
