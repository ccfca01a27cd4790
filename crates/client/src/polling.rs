//! Polling engine shared by all three job kinds.
//!
//! A [`JobAdapter`] describes how one kind is polled and read; the loop in
//! [`poll_until_terminal`] is the same for all of them. The loop is the only
//! place in the crate where a failed remote call is retried.

use serde::de::DeserializeOwned;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use helio_core::config::PollConfig;
use helio_core::error::HelioError;
use helio_core::job::{JobKind, JobPhase, JobStatus};
use helio_core::progress::ProgressSink;

use crate::operations::RemoteOperation;
use crate::transport::{take_field, Transport};

/// Per-kind capabilities the polling loop needs.
pub trait JobAdapter {
    /// Job record decoded from the poll response.
    type Job: DeserializeOwned + Send;

    const KIND: JobKind;
    /// Operation name used in errors and logs.
    const POLL_OPERATION: &'static str;
    const POLL_QUERY: &'static str;
    /// Field of `data` holding the job object.
    const ROOT_FIELD: &'static str;

    fn status(job: &Self::Job) -> &JobStatus;

    fn progress(job: &Self::Job) -> Option<f64>;

    /// Kind-specific diagnostics embedded in a poll response. Any entry is
    /// fatal, whatever the status says.
    fn diagnostics(_job: &Self::Job) -> Vec<String> {
        Vec::new()
    }

    /// Error for a terminal failure status.
    fn terminal_failure(job_id: &str, _job: &Self::Job) -> HelioError {
        HelioError::JobFailed {
            kind: Self::KIND,
            job_id: job_id.to_string(),
        }
    }

    /// Presigned URL of the kind's primary result, once finished.
    fn result_url(_job: &Self::Job) -> Option<&str> {
        None
    }

    fn poll_operation(job_id: &str) -> RemoteOperation {
        RemoteOperation::new(Self::POLL_OPERATION, Self::POLL_QUERY, json!({ "id": job_id }))
    }
}

/// Shared collaborators of one poll loop.
#[derive(Clone, Copy)]
pub struct PollContext<'a> {
    pub transport: &'a dyn Transport,
    pub progress: &'a dyn ProgressSink,
    pub cancel: &'a CancellationToken,
}

impl<'a> PollContext<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        progress: &'a dyn ProgressSink,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            transport,
            progress,
            cancel,
        }
    }
}

/// A job that reached its kind's terminal success status.
#[derive(Debug, Clone)]
pub struct FinishedJob<J> {
    pub job: J,
    /// Primary result URL, when the kind has one and the service set it.
    pub result_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Loop bookkeeping
// ---------------------------------------------------------------------------

/// What the loop should do after recording a failed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureVerdict {
    Retry,
    Abort,
}

/// Mutable state of one poll loop. Never shared between jobs.
#[derive(Debug, Clone)]
pub struct PollSession {
    pub consecutive_failures: u32,
    pub elapsed_polls: u32,
    pub last_status: JobStatus,
}

impl PollSession {
    pub fn new(initial_status: JobStatus) -> Self {
        Self {
            consecutive_failures: 0,
            elapsed_polls: 0,
            last_status: initial_status,
        }
    }

    /// Whether the poll-count ceiling has been reached.
    pub fn exhausted(&self, config: &PollConfig) -> bool {
        config
            .max_polls
            .is_some_and(|max| self.elapsed_polls >= max)
    }

    pub fn record_failure(&mut self, config: &PollConfig) -> FailureVerdict {
        self.consecutive_failures += 1;
        match config.max_consecutive_failures {
            Some(budget) if self.consecutive_failures >= budget => FailureVerdict::Abort,
            _ => FailureVerdict::Retry,
        }
    }

    /// A poll without transport or protocol errors. An unknown status
    /// keeps the last known one.
    pub fn record_success(&mut self, status: JobStatus) {
        self.consecutive_failures = 0;
        if !status.is_unknown() {
            self.last_status = status;
        }
    }

    /// A successful call that carried no job object.
    pub fn record_unknown(&mut self) {
        self.consecutive_failures = 0;
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Poll `job_id` until its status is terminal.
///
/// Each iteration: optionally sleep (cancellable), issue one poll call,
/// then either absorb the failure into the budget or inspect the job.
/// Diagnostics are checked before the status.
pub async fn poll_until_terminal<A: JobAdapter>(
    ctx: &PollContext<'_>,
    config: &PollConfig,
    job_id: &str,
    initial_status: JobStatus,
) -> Result<FinishedJob<A::Job>, HelioError> {
    let mut session = PollSession::new(initial_status);

    tracing::info!(kind = %A::KIND, job_id, "Polling job");

    loop {
        if session.exhausted(config) {
            tracing::warn!(
                kind = %A::KIND,
                job_id,
                polls = session.elapsed_polls,
                status = %session.last_status,
                "Polling timed out",
            );
            return Err(HelioError::PollTimeout {
                kind: A::KIND,
                job_id: job_id.to_string(),
                last_status: session.last_status,
            });
        }

        if session.elapsed_polls > 0 || config.delay_first_poll {
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => {
                    tracing::info!(kind = %A::KIND, job_id, "Polling cancelled");
                    return Err(HelioError::Cancelled {
                        kind: A::KIND,
                        job_id: job_id.to_string(),
                    });
                }
                _ = tokio::time::sleep(config.interval) => {}
            }
        }

        session.elapsed_polls += 1;
        let attempt = session.elapsed_polls;

        let job = match poll_state::<A>(ctx.transport, job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                session.record_unknown();
                tracing::debug!(
                    kind = %A::KIND,
                    job_id,
                    attempt,
                    status = %session.last_status,
                    "Poll carried no job state",
                );
                continue;
            }
            Err(e) if e.is_retryable() => {
                let verdict = session.record_failure(config);
                tracing::warn!(
                    kind = %A::KIND,
                    job_id,
                    attempt,
                    consecutive_failures = session.consecutive_failures,
                    correlation_id = e.correlation_id().unwrap_or_default(),
                    error = %e,
                    "Poll failed",
                );
                if verdict == FailureVerdict::Abort {
                    return Err(HelioError::PollingAborted {
                        kind: A::KIND,
                        job_id: job_id.to_string(),
                        attempts: session.consecutive_failures,
                        last_error: e.to_string(),
                    });
                }
                continue;
            }
            Err(e) => return Err(e),
        };

        session.record_success(A::status(&job).clone());

        let progress = A::progress(&job);
        if let Some(pct) = progress {
            ctx.progress.report(pct);
        }
        tracing::debug!(
            kind = %A::KIND,
            job_id,
            attempt,
            status = %session.last_status,
            progress,
            "Poll",
        );

        let details = A::diagnostics(&job);
        if !details.is_empty() {
            tracing::warn!(
                kind = %A::KIND,
                job_id,
                count = details.len(),
                "Job reported diagnostics",
            );
            return Err(HelioError::Processing {
                kind: A::KIND,
                details,
            });
        }

        let status = A::status(&job);
        match A::KIND.phase(status) {
            JobPhase::Pending => {}
            JobPhase::Succeeded => {
                tracing::info!(kind = %A::KIND, job_id, %status, "Job finished");
                let result_url = A::result_url(&job).map(str::to_string);
                return Ok(FinishedJob { job, result_url });
            }
            JobPhase::Failed => {
                tracing::warn!(kind = %A::KIND, job_id, %status, "Job failed");
                return Err(A::terminal_failure(job_id, &job));
            }
        }
    }
}

/// Issue one poll call and decode the job object.
///
/// A response without a decodable job object is
/// [`HelioError::UnexpectedResponse`].
pub async fn poll_once<A: JobAdapter>(
    transport: &dyn Transport,
    job_id: &str,
) -> Result<A::Job, HelioError> {
    let outcome = transport.execute(&A::poll_operation(job_id)).await;
    let mut data = outcome.into_data(A::POLL_OPERATION)?;
    take_field(&mut data, A::ROOT_FIELD, A::POLL_OPERATION)
}

/// Like [`poll_once`], but a call that succeeded without a decodable job
/// object yields `Ok(None)`. Only transport and protocol errors are `Err`.
async fn poll_state<A: JobAdapter>(
    transport: &dyn Transport,
    job_id: &str,
) -> Result<Option<A::Job>, HelioError> {
    match poll_once::<A>(transport, job_id).await {
        Ok(job) => Ok(Some(job)),
        Err(e @ HelioError::UnexpectedResponse { .. }) => {
            tracing::debug!(
                operation = A::POLL_OPERATION,
                error = %e,
                "Undecodable poll payload",
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
