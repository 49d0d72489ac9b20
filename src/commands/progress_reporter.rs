use crate::activity::Progress;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Instant;

const TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:25}] {msg}";
const TEMPLATE_NO_COLOR: &str = "{prefix:>12} [{bar:25}] {msg}";

/// A progress bar that delays showing itself until a threshold is reached,
/// so short runs never flash a bar at all.
#[derive(Debug)]
pub struct ProgressReporter {
    bar: ProgressBar,
    visible_after: Instant,
    visible: AtomicBool,
}

impl ProgressReporter {
    /// Create a new progress reporter.
    ///
    /// The progress bar only becomes visible if operations continue beyond
    /// the delay threshold. When `use_colors` is false, progress bar chrome
    /// is rendered without ANSI styling.
    #[must_use]
    pub fn new(delay: Duration, use_colors: bool) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_draw_target(ProgressDrawTarget::hidden());

        let template = if use_colors { TEMPLATE } else { TEMPLATE_NO_COLOR };
        bar.set_style(
            ProgressStyle::default_bar()
                .template(template)
                .expect("could not create progress bar style")
                .progress_chars("=> "),
        );

        Self {
            bar,
            visible_after: Instant::now() + delay,
            visible: AtomicBool::new(false),
        }
    }

    fn reveal_if_due(&self) {
        if !self.visible.load(Ordering::Relaxed) && Instant::now() >= self.visible_after {
            self.visible.store(true, Ordering::Relaxed);
            self.bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        }
    }
}

impl Progress for ProgressReporter {
    /// Set the prefix label for the progress bar (e.g., "Collecting").
    fn set_phase(&self, phase: &str) {
        self.bar.set_prefix(phase.to_string());
    }

    fn update(&self, completed: u64, total: u64, message: String) {
        self.reveal_if_due();

        if total > 0 {
            self.bar.set_length(total);
            self.bar.set_position(completed);
        }
        self.bar.set_message(message);
    }

    /// Print a message line without disrupting the progress indicator.
    fn println(&self, message: &str) {
        self.bar.suspend(|| eprintln!("{message}"));
    }

    /// Finish and clear the progress indicator.
    fn done(&self) {
        if self.visible.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
        }
    }
}
