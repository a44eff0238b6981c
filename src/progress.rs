//! Progress reporting for long scrape runs. The orchestrator takes an
//! explicit reporter instead of writing to ambient output, so callers can
//! swap or silence the per-item lines.

pub trait Progress: Send + Sync {
    fn line(&self, message: &str);
}

/// Forwards progress lines into the tracing pipeline.
pub struct LogProgress;

impl Progress for LogProgress {
    fn line(&self, message: &str) {
        tracing::info!("{message}");
    }
}

/// Discards all progress output. For tests and embedders that only want the
/// returned records.
pub struct NullProgress;

impl Progress for NullProgress {
    fn line(&self, _message: &str) {}
}
