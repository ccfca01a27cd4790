//! Progress reporting surface shared by polling and transfers.

/// Receives a 0-100 completion value.
///
/// Called at most once per poll or transfer chunk; implementations should
/// return quickly.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, percent: f64) {
        self(percent)
    }
}

/// Sink that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: f64) {}
}

/// Calculate transfer progress as a percentage (0.0–100.0).
///
/// Returns `None` if the total size is unknown or zero.
pub fn progress_percent(done: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(t) if t > 0 => Some((done as f64 / t as f64 * 100.0).min(100.0)),
        _ => None,
    }
}
