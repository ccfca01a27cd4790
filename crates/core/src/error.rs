use crate::job::{JobKind, JobStatus};

/// Every failure the orchestration core can surface to a caller.
///
/// Remote failures keep the correlation id returned by the service so a
/// user can quote it in a support ticket without digging through logs.
#[derive(Debug, thiserror::Error)]
pub enum HelioError {
    /// Network or HTTP-layer failure of a single envelope call.
    #[error("{operation}: {message} (trace: {correlation_id})")]
    Transport {
        operation: &'static str,
        message: String,
        correlation_id: String,
    },

    /// The service answered with structured errors for an otherwise
    /// successful HTTP exchange.
    #[error("{operation} error: {} (trace: {correlation_id})", .messages.join("; "))]
    Protocol {
        operation: &'static str,
        messages: Vec<String>,
        correlation_id: String,
    },

    /// Job-specific diagnostics reported while the job was still being polled.
    #[error("{kind} processing errors: {}", .details.join("; "))]
    Processing { kind: JobKind, details: Vec<String> },

    /// The job reached the terminal `FAILED` status.
    #[error("{kind} failed on the server (id: {job_id})")]
    JobFailed { kind: JobKind, job_id: String },

    /// Too many consecutive poll calls failed.
    #[error(
        "{kind} {job_id}: too many consecutive poll failures ({attempts}); \
         last error: {last_error}"
    )]
    PollingAborted {
        kind: JobKind,
        job_id: String,
        attempts: u32,
        last_error: String,
    },

    /// The poll-count ceiling was reached without a terminal status.
    #[error("{kind} {job_id}: polling timed out. Last status: {last_status}")]
    PollTimeout {
        kind: JobKind,
        job_id: String,
        last_status: JobStatus,
    },

    /// Registration ended in `ERROR` or `RESTRICTED`.
    #[error("G-code registration {job_id} failed with status: {status}")]
    RegistrationRejected { job_id: String, status: JobStatus },

    #[error("Upload failed: HTTP {status} - {body}")]
    UploadFailed { status: u16, body: String },

    /// A download answered 404. For enterprise exports this usually means the
    /// feature has not been enabled for the account.
    #[error(
        "File not found (404) at {url}. The requested data may not be available for this \
         job or layer, or the feature may not be enabled for your account."
    )]
    ArtifactNotFound { url: String },

    #[error("Transfer failed: HTTP {status} - {body}")]
    TransferFailed { status: u16, body: String },

    /// The caller's cancellation token fired between poll attempts.
    #[error("{kind} {job_id}: polling cancelled")]
    Cancelled { kind: JobKind, job_id: String },

    #[error("Configuration error: {0}")]
    Config(String),

    /// The service answered without the fields an operation needs.
    #[error("Unexpected response from {operation}: {message}")]
    UnexpectedResponse {
        operation: &'static str,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HelioError {
    /// Whether the Polling Engine may absorb this error into its failure
    /// budget. Only transport and protocol errors qualify; nothing else in
    /// the crate retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Protocol { .. })
    }

    /// Correlation id attached to the failing remote call, if any.
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::Transport { correlation_id, .. } | Self::Protocol { correlation_id, .. } => {
                Some(correlation_id)
            }
            _ => None,
        }
    }
}
