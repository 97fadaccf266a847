//! Completion polling: a bounded-retry observer over an externally
//! supplied job status source.
//!
//! After an upload is finalized, the warehouse processes it
//! asynchronously. This crate drives the `Unknown -> Pending ->
//! {Success, Failed}` state machine: fetch, check terminal, sleep,
//! repeat, with a hard attempt budget instead of implicit loop counting.
//! It performs no upload or fingerprint work of its own, so it tests
//! cleanly against a fake clock and a scripted status sequence.

use std::future::Future;
use std::time::Duration;

use tracing::debug;
use wsync_protocol::{JobReport, JobStatus};

/// Errors that end a poll without a successful terminal status.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The server reported the job as failed. Carries the server's error
    /// list verbatim.
    #[error("job failed: {errors:?}")]
    JobFailed { errors: Vec<String> },

    /// The attempt budget ran out before a terminal status arrived.
    /// Carries the measured wall-clock time spent polling and the last
    /// observed status for diagnostics.
    #[error("timed out after {waited:?} ({attempts} polls, last status {last:?})")]
    TimedOut {
        waited: Duration,
        attempts: u32,
        last: JobStatus,
    },

    #[error("poll interval must be greater than zero")]
    InvalidInterval,

    /// The status source itself failed (transport error).
    #[error("status fetch failed: {0}")]
    Fetch(String),
}

/// Polls `fetch` every `interval` until the job reaches a terminal state
/// or the budget of `floor(max_wait / interval)` attempts is spent.
///
/// The first fetch happens immediately (attempt 1, no leading sleep);
/// sleeps only separate attempts. Fetches are strictly sequential.
/// `Success` returns the report; `Failed` returns
/// [`PollError::JobFailed`] with the server's errors; running out of
/// budget returns [`PollError::TimedOut`] with the last observed
/// non-terminal status (or [`JobStatus::Unknown`] if the budget was
/// zero and nothing was ever fetched).
pub async fn poll_until_complete<F, Fut>(
    mut fetch: F,
    interval: Duration,
    max_wait: Duration,
) -> Result<JobReport, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobReport, PollError>>,
{
    if interval.is_zero() {
        return Err(PollError::InvalidInterval);
    }

    let budget = (max_wait.as_nanos() / interval.as_nanos()) as u32;
    let start = tokio::time::Instant::now();
    let mut last = JobStatus::Unknown;

    for attempt in 1..=budget {
        let report = fetch().await?;
        debug!(attempt, budget, status = ?report.status, "poll");

        match report.status {
            JobStatus::Success => return Ok(report),
            JobStatus::Failed => {
                return Err(PollError::JobFailed {
                    errors: report.errors,
                });
            }
            status => last = status,
        }

        if attempt < budget {
            tokio::time::sleep(interval).await;
        }
    }

    Err(PollError::TimedOut {
        waited: start.elapsed(),
        attempts: budget,
        last,
    })
}
