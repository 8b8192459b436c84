//! Task trait for serially applied mutations
//!
//! A Task is one remote mutation planned ahead of execution. Tasks are
//! plain data: planning produces them, a single worker applies them.

use crate::types::ChangeKind;
use std::fmt;

/// Core trait for planned mutations
///
/// Every task describes:
/// - Identity (label, type)
/// - The kind of change it makes
///
/// Applying a task is the job of whoever drains the queue; the task
/// itself carries no behavior.
///
/// # Example
///
/// ```
/// use declarative::{ChangeKind, Task};
///
/// #[derive(Debug)]
/// struct CreateBucket {
///     name: String,
/// }
///
/// impl Task for CreateBucket {
///     fn label(&self) -> String {
///         format!("create bucket {}", self.name)
///     }
///
///     fn task_type(&self) -> &'static str {
///         "bucket"
///     }
///
///     fn kind(&self) -> ChangeKind {
///         ChangeKind::Create
///     }
/// }
/// ```
pub trait Task: fmt::Debug {
    /// Human-readable label, stable across runs for the same change
    fn label(&self) -> String;

    /// Task type category
    ///
    /// Used for grouping and filtering. Examples:
    /// - "resource"
    /// - "method"
    fn task_type(&self) -> &'static str;

    /// Kind of change this task makes
    fn kind(&self) -> ChangeKind;

    /// Identifier of the thing the task acts on
    ///
    /// Defaults to the label.
    fn target(&self) -> String {
        self.label()
    }
}
