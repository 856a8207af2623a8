//! Text output formatter for human-readable display
//!
//! This module provides:
//! - One line per upgrade attempt with its severity and final state
//! - Per dependency type headers with outdated/group counts
//! - Summary with committed/reverted/failed breakdown

use crate::domain::{DependencyTypeResult, RunSummary, Severity, UpgradeAttempt, UpgradeState};
use crate::output::{OutputFormatter, Verbosity};
use colored::Colorize;
use std::io::Write;

/// Minimum width of the package name column
const NAME_WIDTH: usize = 20;

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self::with_color(verbosity, true)
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn dry_run_prefix(&self, summary: &RunSummary) -> String {
        match (summary.dry_run, self.color) {
            (false, _) => String::new(),
            (true, true) => format!("{} ", "(dry-run)".cyan()),
            (true, false) => "(dry-run) ".to_string(),
        }
    }

    fn severity_label(&self, severity: Severity) -> String {
        let label = severity.label();
        if !self.color {
            return label.to_string();
        }
        match severity {
            Severity::Major => label.red().bold().to_string(),
            Severity::Minor => label.yellow().to_string(),
            Severity::Patch => label.green().to_string(),
            Severity::None => label.dimmed().to_string(),
        }
    }

    fn state_label(&self, state: UpgradeState) -> String {
        let label = state.label();
        if !self.color {
            return label.to_string();
        }
        match state {
            UpgradeState::Committed => label.green().bold().to_string(),
            UpgradeState::Planned => label.cyan().to_string(),
            UpgradeState::RevertedCleanly => label.yellow().to_string(),
            UpgradeState::ApplyFailed | UpgradeState::CommitFailed | UpgradeState::RevertFailed => {
                label.red().bold().to_string()
            }
            _ => label.to_string(),
        }
    }

    fn format_attempt_line(
        &self,
        attempt: &UpgradeAttempt,
        severity: Severity,
        name_width: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let arrow = if self.color {
            "→".dimmed().to_string()
        } else {
            "->".to_string()
        };
        writeln!(
            writer,
            "  {:width$} {} {} {} [{}] {}",
            attempt.package(),
            attempt.previous_version,
            arrow,
            attempt.target_version,
            self.severity_label(severity),
            self.state_label(attempt.state),
            width = name_width
        )?;

        if self.verbosity == Verbosity::Verbose {
            if let Some(note) = &attempt.note {
                for line in note.lines().filter(|l| !l.trim().is_empty()) {
                    if self.color {
                        writeln!(writer, "      {}", line.dimmed())?;
                    } else {
                        writeln!(writer, "      {}", line)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn format_summary(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let prefix = self.dry_run_prefix(summary);
        let committed = summary.committed();
        let reverted = summary.reverted();
        let planned = summary.count(UpgradeState::Planned);
        let failed = summary
            .attempts()
            .filter(|a| {
                matches!(
                    a.state,
                    UpgradeState::ApplyFailed
                        | UpgradeState::CommitFailed
                        | UpgradeState::RevertFailed
                )
            })
            .count();

        if self.verbosity == Verbosity::Quiet {
            let line = if summary.dry_run {
                format!("{} planned", planned)
            } else {
                format!("{} committed, {} reverted, {} failed", committed, reverted, failed)
            };
            return writeln!(writer, "{}{}", prefix, line);
        }

        if self.color {
            writeln!(writer, "{}{}:", prefix, "Summary".bold())?;
        } else {
            writeln!(writer, "{}Summary:", prefix)?;
        }

        if summary.dry_run {
            writeln!(writer, "  {} upgrade(s) planned", planned)?;
        } else if self.color {
            writeln!(
                writer,
                "  {} committed, {} reverted, {} failed",
                committed.to_string().green(),
                reverted.to_string().yellow(),
                failed.to_string().red()
            )?;
        } else {
            writeln!(
                writer,
                "  {} committed, {} reverted, {} failed",
                committed, reverted, failed
            )?;
        }

        let errors = summary.errors();
        if !errors.is_empty() {
            if self.color {
                writeln!(writer, "{}:", "Errors".red().bold())?;
            } else {
                writeln!(writer, "Errors:")?;
            }
            for error in &errors {
                let first_line = error.lines().next().unwrap_or_default();
                if self.color {
                    writeln!(writer, "  {} {}", "✗".red(), first_line)?;
                } else {
                    writeln!(writer, "  - {}", first_line)?;
                }
            }
        }

        if let Some(reason) = &summary.halted {
            if self.color {
                writeln!(writer, "{} {}", "Stopped:".red().bold(), reason)?;
            } else {
                writeln!(writer, "Stopped: {}", reason)?;
            }
        }

        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            for result in &summary.dependency_types {
                self.format_dependency_type(result, writer)?;
            }
        }
        self.format_summary(summary, writer)
    }

    fn format_dependency_type(
        &self,
        result: &DependencyTypeResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if result.attempts.is_empty() && result.error.is_none() && self.verbosity != Verbosity::Verbose
        {
            return Ok(());
        }

        if self.color {
            writeln!(
                writer,
                "{} {}",
                result.dependency_type.bold(),
                format!(
                    "({} outdated, {} group(s))",
                    result.outdated, result.groups
                )
                .dimmed()
            )?;
        } else {
            writeln!(
                writer,
                "{} ({} outdated, {} group(s))",
                result.dependency_type, result.outdated, result.groups
            )?;
        }

        if let Some(error) = &result.error {
            if self.color {
                writeln!(writer, "  {} {}", "✗".red(), error)?;
            } else {
                writeln!(writer, "  error: {}", error)?;
            }
        }

        let name_width = result
            .attempts
            .iter()
            .map(|a| a.package().len())
            .max()
            .unwrap_or(0)
            .max(NAME_WIDTH);

        for attempt in &result.attempts {
            self.format_attempt_line(attempt, attempt.severity(), name_width, writer)?;
        }

        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyRecord, Strategy};

    fn attempt(name: &str, state: UpgradeState, note: Option<&str>) -> UpgradeAttempt {
        let record = DependencyRecord {
            name: name.to_string(),
            current_version: "4.17.20".to_string(),
            wanted_version: "4.17.21".to_string(),
            latest_version: "5.0.0".to_string(),
            wanted_delta: Severity::Patch,
            latest_delta: Severity::Major,
            package_type: None,
        };
        let mut attempt = UpgradeAttempt::new(record, "dependencies", "4.17.21");
        attempt.state = state;
        attempt.note = note.map(str::to_string);
        attempt
    }

    fn render(formatter: &TextFormatter, summary: &RunSummary) -> String {
        let mut out = Vec::new();
        formatter.format(summary, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn sample_summary() -> RunSummary {
        let mut deps = DependencyTypeResult::new("dependencies");
        deps.outdated = 3;
        deps.groups = 2;
        deps.attempts.push(attempt("lodash", UpgradeState::Committed, None));
        deps.attempts.push(attempt(
            "react",
            UpgradeState::RevertedCleanly,
            Some("'yarn test' failed\nExpected 1 to be 2"),
        ));

        let mut summary = RunSummary::new(Strategy::Conservative, false);
        summary.add(deps);
        summary.add(DependencyTypeResult::new("devDependencies"));
        summary
    }

    #[test]
    fn test_format_plain() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, false);
        let output = render(&formatter, &sample_summary());

        assert!(output.contains("dependencies (3 outdated, 2 group(s))"));
        assert!(output.contains("4.17.20 -> 4.17.21 [patch] committed"));
        assert!(output.contains("[patch] reverted"));
        assert!(output.contains("1 committed, 1 reverted, 0 failed"));
        // empty dependency types are hidden outside verbose mode
        assert!(!output.contains("devDependencies"));
        assert!(!output.contains("Expected 1 to be 2"));
    }

    #[test]
    fn test_format_verbose_shows_notes_and_empty_types() {
        let formatter = TextFormatter::with_color(Verbosity::Verbose, false);
        let output = render(&formatter, &sample_summary());
        assert!(output.contains("devDependencies (0 outdated, 0 group(s))"));
        assert!(output.contains("      Expected 1 to be 2"));
    }

    #[test]
    fn test_format_quiet() {
        let formatter = TextFormatter::with_color(Verbosity::Quiet, false);
        let output = render(&formatter, &sample_summary());
        assert_eq!(output, "1 committed, 1 reverted, 0 failed\n");
    }

    #[test]
    fn test_format_dry_run() {
        let mut deps = DependencyTypeResult::new("dependencies");
        deps.attempts.push(attempt("lodash", UpgradeState::Planned, None));
        let mut summary = RunSummary::new(Strategy::Conservative, true);
        summary.add(deps);

        let formatter = TextFormatter::with_color(Verbosity::Normal, false);
        let output = render(&formatter, &summary);
        assert!(output.contains("[patch] planned"));
        assert!(output.contains("(dry-run) Summary:"));
        assert!(output.contains("1 upgrade(s) planned"));
    }

    #[test]
    fn test_format_errors_and_halt() {
        let mut deps = DependencyTypeResult::new("dependencies");
        deps.attempts.push(attempt(
            "lodash",
            UpgradeState::CommitFailed,
            Some("'git push' failed: rejected"),
        ));
        let mut summary = RunSummary::new(Strategy::Conservative, false);
        summary.add(deps);
        summary.add(DependencyTypeResult::failed(
            "devDependencies",
            "outdated report is missing required column 'Wanted'",
        ));
        summary.halted = Some("commit of lodash failed".to_string());

        let formatter = TextFormatter::with_color(Verbosity::Normal, false);
        let output = render(&formatter, &summary);
        assert!(output.contains("  error: outdated report is missing required column 'Wanted'"));
        assert!(output.contains("Errors:"));
        assert!(output.contains("  - lodash (commit failed): 'git push' failed: rejected"));
        assert!(output.contains("Stopped: commit of lodash failed"));
        assert!(output.contains("0 committed, 0 reverted, 1 failed"));
    }

    #[test]
    fn test_aggressive_target_uses_latest_severity() {
        let mut major = attempt("lodash", UpgradeState::Planned, None);
        major.target_version = "5.0.0".to_string();
        let mut deps = DependencyTypeResult::new("dependencies");
        deps.attempts.push(major);
        let mut summary = RunSummary::new(Strategy::Aggressive, true);
        summary.add(deps);

        let formatter = TextFormatter::with_color(Verbosity::Normal, false);
        let output = render(&formatter, &summary);
        assert!(output.contains("4.17.20 -> 5.0.0 [major] planned"));
    }
}
