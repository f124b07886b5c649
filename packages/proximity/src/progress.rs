//! Row-level progress for route enrichment.
//!
//! Enrichment issues one routing request per rental, so a large export
//! keeps the process busy for a long time. Stages report through
//! [`ProgressCallback`]; the CLI draws it as a terminal bar and tests
//! pass [`NullProgress`].

use std::sync::Arc;

/// Sink for the progress of one routed feature.
pub trait ProgressCallback: Send + Sync {
    /// Number of rentals that will be visited.
    fn set_total(&self, total: u64);

    /// `delta` more rentals have been visited.
    fn inc(&self, delta: u64);

    fn set_message(&self, msg: String);

    /// Called once after the last rental, with a summary line.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// A shared [`NullProgress`] for callers that need an owned handle.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
