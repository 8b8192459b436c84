//! Change computation for planned tasks

use crate::task::Task;
use crate::types::ChangeKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single planned change, detached from the task that produces it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Identifier of the thing being changed
    pub target: String,
    /// Type of the thing being changed
    pub change_type: String,
    /// Human-readable description
    pub description: String,
    /// Kind of change
    pub kind: ChangeKind,
}

impl Change {
    /// Create a change by hand, for state that is not expressed as a task
    pub fn new(
        target: impl Into<String>,
        change_type: impl Into<String>,
        kind: ChangeKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            change_type: change_type.into(),
            description: description.into(),
            kind,
        }
    }

    /// Describe a task as a change
    pub fn from_task(task: &dyn Task) -> Self {
        Self {
            target: task.target(),
            change_type: task.task_type().to_string(),
            description: task.label(),
            kind: task.kind(),
        }
    }
}

/// Compute changes for a list of tasks, preserving order
pub fn compute_changes<'a, T, I>(tasks: I) -> Vec<Change>
where
    T: Task + 'a,
    I: IntoIterator<Item = &'a T>,
{
    tasks
        .into_iter()
        .map(|t| Change::from_task(t as &dyn Task))
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of things to create
    pub additions: usize,
    /// Number of things to remove
    pub removals: usize,
    /// Number of things to modify
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of changes
    pub fn from_changes(changes: &[Change]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.kind {
                ChangeKind::Create => summary.additions += 1,
                ChangeKind::Remove => summary.removals += 1,
                ChangeKind::Modify => summary.modifications += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group changes by type, keeping per-type order
pub fn group_by_type(changes: &[Change]) -> BTreeMap<&str, Vec<&Change>> {
    let mut groups: BTreeMap<&str, Vec<&Change>> = BTreeMap::new();
    for change in changes {
        groups
            .entry(change.change_type.as_str())
            .or_default()
            .push(change);
    }
    groups
}
