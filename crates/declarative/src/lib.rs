//! # Declarative
//!
//! Plumbing for converging remote state onto a declared target.
//!
//! This crate provides the core abstractions for planning mutations ahead
//! of time and applying them strictly in order.
//!
//! ## Core Concepts
//!
//! - **Task**: One planned mutation, described as plain data
//! - **SerialQueue**: An ordered queue of tasks drained by a single worker
//! - **ApplyResult**: What applying one task did
//! - **Change**: A task (or any planned change) detached for reporting
//!
//! ## Example
//!
//! ```
//! use declarative::{ApplyResult, ChangeKind, NoProgress, SerialQueue, Task};
//!
//! #[derive(Debug)]
//! struct Touch(&'static str);
//!
//! impl Task for Touch {
//!     fn label(&self) -> String { format!("touch {}", self.0) }
//!     fn task_type(&self) -> &'static str { "file" }
//!     fn kind(&self) -> ChangeKind { ChangeKind::Create }
//! }
//!
//! let queue: SerialQueue<_> = [Touch("a"), Touch("b")].into_iter().collect();
//! let summary = queue
//!     .drain(&mut NoProgress, |_task| Ok::<_, std::io::Error>(ApplyResult::Created))
//!     .unwrap();
//! assert_eq!(summary.created, 2);
//! ```
//!
//! ## Provider Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod queue;
pub mod task;
pub mod types;

// Re-export main types at crate root
pub use context::{
    AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback, RecordingProgress,
};
pub use diff::{Change, DiffSummary, compute_changes, group_by_type};
pub use queue::SerialQueue;
pub use task::Task;
pub use types::{ApplyResult, ChangeKind, ExecuteSummary};
