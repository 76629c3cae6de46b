/// Progress notifications a caller (CLI, future daemon) can observe during a
/// reindex without coupling the indexer to any particular UI.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    FileStarted { path: String },
    FileIndexed { path: String },
    FileSkippedUnchanged { path: String },
    FileFailed { path: String, message: String },
    Warning { message: String },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Swallows every event; the default when a caller doesn't care.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_event(&self, _event: ProgressEvent) {}
}
