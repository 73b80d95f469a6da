/// Receives progress for a harvest run: one unit per candidate.
pub trait ProgressSink: Send + Sync {
    fn start(&self, total: u64);
    fn advance(&self, by: u64);
    fn finish(&self) {}
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _total: u64) {}
    fn advance(&self, _by: u64) {}
}
