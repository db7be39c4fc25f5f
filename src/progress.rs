// ABOUTME: Progress reporting for completed imports
// ABOUTME: Wraps an indicatif bar with an exact, shareable completion counter

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts completed imports out of the scheduled total.
///
/// Cloning shares the same counter; every clone increments the same bar.
#[derive(Clone)]
pub struct ReloadProgress {
    bar: ProgressBar,
    completed: Arc<AtomicU64>,
    total: u64,
}

impl ReloadProgress {
    pub fn new(dest_alias: &str, total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "Reloading {} [{{bar:20}}] {{percent}}% in {{elapsed}}",
                    dest_alias
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(200));

        Self {
            bar,
            completed: Arc::new(AtomicU64::new(0)),
            total,
        }
    }

    /// A progress counter that draws nothing
    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden());
        Self {
            bar,
            completed: Arc::new(AtomicU64::new(0)),
            total,
        }
    }

    /// Record one completed import, returns the new count
    pub fn tick(&self) -> u64 {
        self.bar.inc(1);
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn finish(&self) {
        self.bar.finish();
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
