/// Interface the collection pipeline uses to report progress, keeping it
/// independent of any particular rendering.
pub trait Progress: Send + Sync {
    /// Announce the phase of work about to start.
    fn set_phase(&self, phase: &str);

    /// Report that `completed` of `total` work items are done.
    fn update(&self, completed: u64, total: u64, message: String);

    /// Print a line without disturbing any progress rendering.
    fn println(&self, message: &str);

    /// Mark the work as finished.
    fn done(&self);
}

/// A [`Progress`] implementation that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn set_phase(&self, _phase: &str) {}
    fn update(&self, _completed: u64, _total: u64, _message: String) {}
    fn println(&self, _message: &str) {}
    fn done(&self) {}
}
