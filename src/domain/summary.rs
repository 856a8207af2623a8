//! Run summary types
//!
//! Provides structures for tracking results per dependency type and for the
//! whole run.

use super::{Strategy, UpgradeAttempt, UpgradeState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of processing one dependency type (e.g. `devDependencies`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyTypeResult {
    /// Manifest section name
    pub dependency_type: String,
    /// Number of outdated packages reported
    pub outdated: usize,
    /// Number of candidate groups formed
    pub groups: usize,
    /// Attempts made, in order
    pub attempts: Vec<UpgradeAttempt>,
    /// Error that aborted this dependency type, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DependencyTypeResult {
    /// Creates an empty result
    pub fn new(dependency_type: impl Into<String>) -> Self {
        Self {
            dependency_type: dependency_type.into(),
            outdated: 0,
            groups: 0,
            attempts: Vec::new(),
            error: None,
        }
    }

    /// Creates a result for a dependency type that could not be processed
    pub fn failed(dependency_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(dependency_type)
        }
    }

    /// Returns attempts that ended in `state`
    pub fn attempts_in(&self, state: UpgradeState) -> impl Iterator<Item = &UpgradeAttempt> {
        self.attempts.iter().filter(move |a| a.state == state)
    }
}

/// Overall summary of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Strategy used for grouping and targets
    pub strategy: Strategy,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Results per dependency type, in processing order
    pub dependency_types: Vec<DependencyTypeResult>,
    /// Set when the run stopped before processing every candidate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<String>,
}

impl RunSummary {
    /// Creates a new RunSummary
    pub fn new(strategy: Strategy, dry_run: bool) -> Self {
        Self {
            strategy,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            dependency_types: Vec::new(),
            halted: None,
        }
    }

    /// Adds a dependency type result
    pub fn add(&mut self, result: DependencyTypeResult) {
        self.dependency_types.push(result);
    }

    /// Marks the run as finished
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// All attempts across dependency types
    pub fn attempts(&self) -> impl Iterator<Item = &UpgradeAttempt> {
        self.dependency_types.iter().flat_map(|t| t.attempts.iter())
    }

    /// Number of attempts that ended in `state`
    pub fn count(&self, state: UpgradeState) -> usize {
        self.attempts().filter(|a| a.state == state).count()
    }

    /// Number of committed upgrades
    pub fn committed(&self) -> usize {
        self.count(UpgradeState::Committed)
    }

    /// Number of reverted upgrades
    pub fn reverted(&self) -> usize {
        self.count(UpgradeState::RevertedCleanly)
    }

    /// Errors worth surfacing: aborted dependency types and failed attempts
    pub fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for result in &self.dependency_types {
            if let Some(error) = &result.error {
                errors.push(format!("{}: {}", result.dependency_type, error));
            }
            for attempt in &result.attempts {
                if matches!(
                    attempt.state,
                    UpgradeState::ApplyFailed
                        | UpgradeState::CommitFailed
                        | UpgradeState::RevertFailed
                ) {
                    errors.push(format!(
                        "{} ({}): {}",
                        attempt.package(),
                        attempt.state,
                        attempt.note.as_deref().unwrap_or("no details")
                    ));
                }
            }
        }
        errors
    }

    /// Returns true if any work needs attention
    pub fn has_errors(&self) -> bool {
        !self.errors().is_empty() || self.halted.is_some()
    }
}
