//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Receives progress from a decomposition run and tells it when to stop.
/// Cancellation is checked between sub-models only.
pub trait ProgressMonitor {
    fn begin_task(&mut self, name: &str, total: usize);
    fn worked(&mut self, units: usize);
    fn is_cancelled(&self) -> bool;
    fn done(&mut self);
}

/// Ignores progress; never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressMonitor for NullProgress {
    fn begin_task(&mut self, _name: &str, _total: usize) {}
    fn worked(&mut self, _units: usize) {}
    fn is_cancelled(&self) -> bool {
        false
    }
    fn done(&mut self) {}
}

/// A cancellation flag that can be shared with another thread.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl ProgressMonitor for CancellationToken {
    fn begin_task(&mut self, _name: &str, _total: usize) {}
    fn worked(&mut self, _units: usize) {}
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
    fn done(&mut self) {}
}

/// Logs progress through `tracing`.
#[derive(Debug, Default, Clone)]
pub struct LoggingProgress {
    token: CancellationToken,
    task: String,
    total: usize,
    completed: usize,
}

impl LoggingProgress {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }
}

impl ProgressMonitor for LoggingProgress {
    fn begin_task(&mut self, name: &str, total: usize) {
        self.task = name.to_string();
        self.total = total;
        self.completed = 0;
        info!(task = %self.task, total, "Started");
    }

    fn worked(&mut self, units: usize) {
        self.completed += units;
        info!(
            task = %self.task,
            completed = self.completed,
            total = self.total,
            "Progress"
        );
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn done(&mut self) {
        info!(task = %self.task, completed = self.completed, "Finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_cancellation_flag() {
        let token = CancellationToken::new();
        let mut monitor = LoggingProgress::new(token.clone());
        assert!(!monitor.is_cancelled());
        token.cancel();
        assert!(monitor.is_cancelled());

        monitor.begin_task("decompose", 2);
        monitor.worked(1);
        monitor.worked(1);
        monitor.done();
        assert_eq!(monitor.completed(), 2);
    }

    #[test]
    fn null_progress_never_cancels() {
        assert!(!NullProgress.is_cancelled());
    }
}
