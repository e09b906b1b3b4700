//! Progress display for a full benchmark run.
//!
//! ```text
//!   ⠋ Step 3/6: Sequential Read 1GB
//!   ███████████░░░░░░░░░░░░░░░░░░░░░░░░░░░░░  ETA 00:01:12
//! ```

use crate::bench::{Phase, PhaseProgress};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::time::{Duration, Instant};

struct ReporterState {
    /// Phase of the most recent step.
    current_phase: Option<Phase>,
}

/// Renders [`PhaseProgress`] updates as an indicatif bar.
///
/// Uses interior mutability via `RefCell` so that `update()` can be called
/// from `Fn` callbacks.
pub struct PhaseProgressReporter {
    progress: ProgressBar,
    color: bool,
    start_time: Instant,
    state: RefCell<ReporterState>,
}

impl PhaseProgressReporter {
    /// Create a reporter for a run of `total_steps` steps.
    pub fn new(total_steps: usize, color: bool) -> Self {
        let progress = ProgressBar::new(total_steps as u64);

        let template = if color {
            "  {spinner:.cyan} {msg}\n  {bar:40.cyan/dim}  ETA {eta}"
        } else {
            "  {spinner} {msg}\n  {bar:40}  ETA {eta}"
        };
        // Templates are static; fall back to the default style rather than panic.
        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);

        progress.set_style(style);
        progress.set_message("Starting...");
        progress.enable_steady_tick(Duration::from_millis(100));

        Self::with_bar(progress, color)
    }

    fn with_bar(progress: ProgressBar, color: bool) -> Self {
        Self {
            progress,
            color,
            start_time: Instant::now(),
            state: RefCell::new(ReporterState {
                current_phase: None,
            }),
        }
    }

    /// Reporter that draws nothing.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden(), false)
    }

    /// Update the display from a runner callback.
    pub fn update(&self, progress: &PhaseProgress) {
        use owo_colors::OwoColorize;

        let mut state = self.state.borrow_mut();
        if state.current_phase != Some(progress.phase) {
            tracing::debug!(phase = progress.phase.key(), "phase_changed");
            state.current_phase = Some(progress.phase);
        }

        self.progress.set_length(progress.total_steps as u64);
        self.progress.set_position(progress.step_index as u64);

        let step = format!("Step {}/{}", progress.step_index + 1, progress.total_steps);
        let message = if self.color {
            format!("{}: {}", step.bold(), progress.step_name.cyan())
        } else {
            format!("{step}: {}", progress.step_name)
        };
        self.progress.set_message(message);
    }

    /// Finish the progress bar and clear the display.
    ///
    /// Returns the total elapsed time.
    pub fn finish(self) -> Duration {
        self.progress.finish_and_clear();
        self.start_time.elapsed()
    }

    /// Clear the bar after a failed run.
    pub fn abandon(self) {
        self.progress.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_tracks_phase_changes() {
        let reporter = PhaseProgressReporter::hidden();

        reporter.update(&PhaseProgress {
            phase: Phase::SequentialWrite,
            step_name: "Sequential Write 1GB".to_string(),
            step_index: 0,
            total_steps: 4,
        });
        assert_eq!(reporter.state.borrow().current_phase, Some(Phase::SequentialWrite));
        assert_eq!(reporter.progress.position(), 0);

        reporter.update(&PhaseProgress {
            phase: Phase::SequentialRead,
            step_name: "Sequential Read 1GB".to_string(),
            step_index: 1,
            total_steps: 4,
        });
        assert_eq!(reporter.state.borrow().current_phase, Some(Phase::SequentialRead));
        assert_eq!(reporter.progress.length(), Some(4));
        assert_eq!(reporter.progress.position(), 1);

        let elapsed = reporter.finish();
        assert!(elapsed < Duration::from_secs(60));
    }
}
