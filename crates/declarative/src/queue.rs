//! Serial task queue - applies planned tasks strictly one at a time
//!
//! The queue is the only place remote mutations are executed. It is
//! drained by a single worker (the calling thread): task *n+1* is not
//! started before task *n* has returned. The first failure stops the
//! queue; the remaining tasks are dropped unexecuted.

use crate::context::ProgressCallback;
use crate::task::Task;
use crate::types::{ApplyResult, ExecuteSummary};
use std::collections::VecDeque;
use std::fmt;

/// An ordered queue of planned tasks
#[derive(Debug)]
pub struct SerialQueue<T> {
    tasks: VecDeque<T>,
}

impl<T: Task> SerialQueue<T> {
    /// Create a new empty queue
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Append a task at the end of the queue
    pub fn push(&mut self, task: T) {
        self.tasks.push_back(task);
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterate over queued tasks in execution order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.tasks.iter()
    }

    /// Labels of queued tasks in execution order
    pub fn labels(&self) -> Vec<String> {
        self.tasks.iter().map(Task::label).collect()
    }

    /// Drain the queue, applying each task in order
    ///
    /// `apply` is called once per task. On the first error the failure is
    /// reported to `progress`, the rest of the queue is discarded and the
    /// error is returned unchanged.
    ///
    /// # Returns
    /// Summary of the results of every applied task
    pub fn drain<E, F, P>(mut self, progress: &mut P, mut apply: F) -> Result<ExecuteSummary, E>
    where
        E: fmt::Display,
        F: FnMut(&T) -> Result<ApplyResult, E>,
        P: ProgressCallback + ?Sized,
    {
        let mut summary = ExecuteSummary::default();
        if self.tasks.is_empty() {
            return Ok(summary);
        }

        progress.on_queue_start(self.tasks.len());

        while let Some(task) = self.tasks.pop_front() {
            let label = task.label();
            progress.on_task_start(&label);
            log::debug!("applying {label}");

            match apply(&task) {
                Ok(result) => {
                    progress.on_task_complete(&label, &result);
                    summary.add_result(&result);
                }
                Err(e) => {
                    let message = e.to_string();
                    log::debug!(
                        "{label} failed, dropping {} queued task(s): {message}",
                        self.tasks.len()
                    );
                    progress.on_task_failed(&label, &message);
                    return Err(e);
                }
            }
        }

        progress.on_queue_complete(&summary);
        Ok(summary)
    }
}

impl<T: Task> Default for SerialQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Task> Extend<T> for SerialQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.tasks.extend(iter);
    }
}

impl<T: Task> FromIterator<T> for SerialQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for SerialQueue<T> {
    type Item = T;
    type IntoIter = std::collections::vec_deque::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}
