//! indicatif wiring for the pipeline stages: a day-by-day bar for the
//! extraction loop and spinners for packaging and the HTTP round trips.
//! Everything renders through one MultiProgress so bars never interleave,
//! and all of it collapses to hidden bars in quiet or non-human modes.

use crate::extract::ExtractProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ProgressManager {
    multi: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            enabled,
        }
    }

    /// One tick per day of the period.
    pub fn day_bar(&self, total_days: u64) -> DayBar {
        if !self.enabled {
            return DayBar(ProgressBar::hidden());
        }

        let bar = self.multi.add(ProgressBar::new(total_days));
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}/{len:3} days {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        bar.set_message("extracting...");
        bar.enable_steady_tick(Duration::from_millis(100));
        DayBar(bar)
    }

    pub fn spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    /// Runs `f` with the bars lifted out of the way so printed lines land on
    /// clean rows.
    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if self.enabled {
            self.multi.suspend(f)
        } else {
            f()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Handle on the extraction bar. Clones share the same underlying bar, so
/// one copy can live inside the generator's progress callback while the
/// orchestrator keeps another to finish it.
#[derive(Clone)]
pub struct DayBar(ProgressBar);

impl DayBar {
    pub fn observe(&self, progress: &ExtractProgress) {
        self.0.set_position(progress.days_processed as u64);
        match progress.current_day {
            Some(day) => self.0.set_message(format!("processing {}", day.format("%Y-%m-%d"))),
            None => self.0.set_message("extracting..."),
        }
    }

    pub fn finish(&self, message: &str, duration: Duration) {
        self.0
            .finish_with_message(format!("{} (in {})", message, format_duration(duration)));
    }

    pub fn position(&self) -> u64 {
        self.0.position()
    }

    pub fn is_hidden(&self) -> bool {
        self.0.is_hidden()
    }

    #[cfg(test)]
    fn message(&self) -> String {
        self.0.message()
    }
}

/// Spinner wrapped with the operation's name and a start time, for the
/// single-shot stages (token request, upload, status probe).
pub struct OperationProgress {
    bar: ProgressBar,
    name: String,
    started: std::time::Instant,
}

impl OperationProgress {
    pub fn new(manager: &ProgressManager, name: &str) -> Self {
        Self {
            bar: manager.spinner(name),
            name: name.to_string(),
            started: std::time::Instant::now(),
        }
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn finish_success(&self) {
        self.finish("completed");
    }

    pub fn finish_error(&self, error: &str) {
        self.finish(&format!("failed: {}", error));
    }

    fn finish(&self, outcome: &str) {
        self.bar.finish_with_message(format!(
            "{}: {} ({})",
            self.name,
            outcome,
            format_duration(self.started.elapsed())
        ));
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
