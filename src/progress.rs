//! Live progress of the mutation queue.

use colored::Colorize;
use declarative::{ApplyResult, ExecuteSummary, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress bar over the resource tree mutations of a deploy.
pub struct QueueProgress {
    bar: ProgressBar,
    verbose: bool,
}

impl QueueProgress {
    /// Create a progress reporter; `quiet` hides the bar.
    pub fn new(quiet: bool, verbose: bool) -> Self {
        let bar = ProgressBar::hidden();
        if !quiet {
            bar.set_draw_target(ProgressDrawTarget::stderr());
        }
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { bar, verbose }
    }
}

impl ProgressCallback for QueueProgress {
    fn on_queue_start(&mut self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn on_task_start(&mut self, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn on_task_complete(&mut self, label: &str, result: &ApplyResult) {
        if self.verbose {
            self.bar
                .suspend(|| println!("    {} {}", result.symbol().green(), label));
        }
        self.bar.inc(1);
    }

    fn on_task_failed(&mut self, label: &str, error: &str) {
        self.bar
            .suspend(|| eprintln!("    {} {} ({})", "✗".red(), label, error));
        self.bar.finish_and_clear();
    }

    fn on_queue_complete(&mut self, _summary: &ExecuteSummary) {
        self.bar.finish_and_clear();
    }
}
