//! JSON output formatter for machine processing
//!
//! The run summary is serialized as-is, with a computed `totals` block and
//! the flattened error list added on top.

use crate::domain::{DependencyTypeResult, RunSummary, UpgradeState};
use crate::output::{OutputFormatter, Verbosity};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the full result
#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    summary: &'a RunSummary,
    totals: JsonTotals,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// Attempt counts by outcome
#[derive(Serialize)]
struct JsonTotals {
    committed: usize,
    reverted: usize,
    planned: usize,
    failed: usize,
}

impl JsonTotals {
    fn from_summary(summary: &RunSummary) -> Self {
        Self {
            committed: summary.committed(),
            reverted: summary.reverted(),
            planned: summary.count(UpgradeState::Planned),
            failed: summary.count(UpgradeState::ApplyFailed)
                + summary.count(UpgradeState::CommitFailed)
                + summary.count(UpgradeState::RevertFailed),
        }
    }
}

impl JsonFormatter {
    /// Failure notes can carry pages of test output; keep the head only
    /// unless verbose
    fn trimmed(&self, summary: &RunSummary) -> RunSummary {
        let mut summary = summary.clone();
        if self.verbosity != Verbosity::Verbose {
            for attempt in summary
                .dependency_types
                .iter_mut()
                .flat_map(|t| t.attempts.iter_mut())
            {
                if let Some(note) = attempt.note.as_mut() {
                    if let Some((first, _)) = note.split_once('\n') {
                        *note = first.to_string();
                    }
                }
            }
        }
        summary
    }

    fn write_json<T: Serialize>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let trimmed = self.trimmed(summary);
        let output = JsonOutput {
            summary: &trimmed,
            totals: JsonTotals::from_summary(summary),
            errors: trimmed.errors(),
        };
        Self::write_json(&output, writer)
    }

    fn format_dependency_type(
        &self,
        result: &DependencyTypeResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        Self::write_json(result, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyRecord, Severity, Strategy, UpgradeAttempt};
    use serde_json::Value;

    fn attempt(state: UpgradeState, note: Option<&str>) -> UpgradeAttempt {
        let record = DependencyRecord {
            name: "lodash".to_string(),
            current_version: "4.17.20".to_string(),
            wanted_version: "4.17.21".to_string(),
            latest_version: "5.0.0".to_string(),
            wanted_delta: Severity::Patch,
            latest_delta: Severity::Major,
            package_type: Some("dependencies".to_string()),
        };
        let mut attempt = UpgradeAttempt::new(record, "dependencies", "4.17.21");
        attempt.state = state;
        attempt.note = note.map(str::to_string);
        attempt
    }

    fn render(verbosity: Verbosity, summary: &RunSummary) -> Value {
        let mut out = Vec::new();
        JsonFormatter::new(verbosity)
            .format(summary, &mut out)
            .unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_format_summary() {
        let mut deps = DependencyTypeResult::new("dependencies");
        deps.outdated = 1;
        deps.groups = 1;
        deps.attempts.push(attempt(UpgradeState::Committed, None));
        let mut summary = RunSummary::new(Strategy::Conservative, false);
        summary.add(deps);
        summary.finish();

        let json = render(Verbosity::Normal, &summary);
        assert_eq!(json["strategy"], "conservative");
        assert_eq!(json["dry_run"], false);
        assert_eq!(json["totals"]["committed"], 1);
        assert_eq!(json["totals"]["failed"], 0);
        let attempt = &json["dependency_types"][0]["attempts"][0];
        assert_eq!(attempt["state"], "committed");
        assert_eq!(attempt["target_version"], "4.17.21");
        assert_eq!(attempt["record"]["wanted_delta"], "patch");
        assert_eq!(attempt["record"]["latest_delta"], "major");
        assert!(json.get("errors").is_none());
        assert!(json.get("halted").is_none());
    }

    #[test]
    fn test_format_errors_and_trimmed_notes() {
        let mut deps = DependencyTypeResult::new("dependencies");
        deps.attempts.push(attempt(
            UpgradeState::RevertedCleanly,
            Some("'yarn test' failed\nline 1\nline 2"),
        ));
        deps.attempts.push(attempt(
            UpgradeState::CommitFailed,
            Some("'git push' failed: rejected"),
        ));
        let mut summary = RunSummary::new(Strategy::Conservative, false);
        summary.add(deps);
        summary.halted = Some("commit of lodash failed".to_string());

        let json = render(Verbosity::Normal, &summary);
        assert_eq!(
            json["dependency_types"][0]["attempts"][0]["note"],
            "'yarn test' failed"
        );
        assert_eq!(json["totals"]["reverted"], 1);
        assert_eq!(json["totals"]["failed"], 1);
        assert_eq!(json["errors"].as_array().unwrap().len(), 1);
        assert_eq!(json["halted"], "commit of lodash failed");

        let json = render(Verbosity::Verbose, &summary);
        assert!(json["dependency_types"][0]["attempts"][0]["note"]
            .as_str()
            .unwrap()
            .contains("line 2"));
    }

    #[test]
    fn test_format_dependency_type() {
        let result = DependencyTypeResult::failed("devDependencies", "missing column");
        let mut out = Vec::new();
        JsonFormatter::new(Verbosity::Normal)
            .format_dependency_type(&result, &mut out)
            .unwrap();
        let json: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["dependency_type"], "devDependencies");
        assert_eq!(json["error"], "missing column");
    }
}
