//! Progress display for upgrade runs
//!
//! Status lines go to stderr so stdout stays reserved for the summary. A
//! spinner runs while a verification is in flight.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Progress reporter for the upgrade workflow
pub struct Progress {
    /// Whether output is enabled (disabled in quiet mode)
    enabled: bool,
    /// Echo extra detail lines
    verbose: bool,
    /// Current spinner
    bar: Option<ProgressBar>,
}

impl Progress {
    /// Create a new progress reporter
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            verbose: false,
            bar: None,
        }
    }

    /// Create a disabled progress reporter
    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Also print detail lines
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Show a spinner with a message for an indeterminate operation
    pub fn spinner(&mut self, message: &str) {
        if !self.enabled {
            return;
        }

        let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg} ({elapsed})")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.bar = Some(spinner);
    }

    /// Finish and clear the current spinner
    pub fn finish_and_clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    /// Announce a step, e.g. `Updating lodash (current: 4.17.20, target: 4.17.21)...`
    pub fn step(&self, message: &str) {
        self.line(message.normal().to_string());
    }

    /// Report a step that went well
    pub fn success(&self, message: &str) {
        self.line(format!("{} {}", "✓".green(), message));
    }

    /// Report a step that was undone or skipped
    pub fn warn(&self, message: &str) {
        self.line(format!("{} {}", "!".yellow().bold(), message));
    }

    /// Report a failure; shown even in quiet mode
    pub fn error(&self, message: &str) {
        self.suspend(|| eprintln!("{} {}", "✗".red().bold(), message));
    }

    /// Detail shown only with --verbose
    pub fn detail(&self, message: &str) {
        if self.verbose {
            self.line(message.dimmed().to_string());
        }
    }

    fn line(&self, text: String) {
        if self.enabled {
            self.suspend(|| eprintln!("{}", text));
        }
    }

    fn suspend<F: FnOnce()>(&self, f: F) {
        match &self.bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(true)
    }
}
