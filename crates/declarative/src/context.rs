//! Progress and confirmation callbacks
//!
//! These traits let the crate report progress without depending on a
//! specific terminal UI.

use crate::types::{ApplyResult, ExecuteSummary};

/// Progress callback for queue draining
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called before the first task of a queue runs
    fn on_queue_start(&mut self, count: usize);

    /// Called when starting to apply a single task
    fn on_task_start(&mut self, label: &str);

    /// Called when a task completes successfully
    fn on_task_complete(&mut self, label: &str, result: &ApplyResult);

    /// Called when a task fails; the queue stops afterwards
    fn on_task_failed(&mut self, label: &str, error: &str);

    /// Called when every task of the queue has completed
    fn on_queue_complete(&mut self, summary: &ExecuteSummary);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> std::io::Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_queue_start(&mut self, _count: usize) {}
    fn on_task_start(&mut self, _label: &str) {}
    fn on_task_complete(&mut self, _label: &str, _result: &ApplyResult) {}
    fn on_task_failed(&mut self, _label: &str, _error: &str) {}
    fn on_queue_complete(&mut self, _summary: &ExecuteSummary) {}
}

/// Progress callback that records every event, in order
///
/// Useful in tests to assert on execution order.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    /// Labels of started tasks, in start order
    pub started: Vec<String>,
    /// Labels of completed tasks, in completion order
    pub completed: Vec<String>,
    /// Label and message of the failed task, if any
    pub failed: Option<(String, String)>,
}

impl ProgressCallback for RecordingProgress {
    fn on_queue_start(&mut self, _count: usize) {}

    fn on_task_start(&mut self, label: &str) {
        self.started.push(label.to_string());
    }

    fn on_task_complete(&mut self, label: &str, _result: &ApplyResult) {
        self.completed.push(label.to_string());
    }

    fn on_task_failed(&mut self, label: &str, error: &str) {
        self.failed = Some((label.to_string(), error.to_string()));
    }

    fn on_queue_complete(&mut self, _summary: &ExecuteSummary) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> std::io::Result<bool> {
        Ok(true)
    }
}
