//! Upgrade attempt lifecycle

use super::{DependencyRecord, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a single upgrade attempt
///
/// ```text
/// Selected -> Applying -> Verifying -> Committed
///                |            |    \-> CommitFailed
///                |            |-> RevertedCleanly
///                |            \-> RevertFailed
///                \-> ApplyFailed
/// Selected -> Planned (dry run)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeState {
    Selected,
    Applying,
    Verifying,
    /// Verified, written, committed and pushed
    Committed,
    /// Verified, but staging, committing or pushing failed
    CommitFailed,
    /// Verification failed and the original version was restored
    RevertedCleanly,
    /// Verification failed and restoring the original version failed too
    RevertFailed,
    /// The package manager refused the upgrade; nothing changed
    ApplyFailed,
    /// Dry run: selected but not applied
    Planned,
}

impl UpgradeState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            UpgradeState::Selected | UpgradeState::Applying | UpgradeState::Verifying
        )
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: UpgradeState) -> bool {
        use UpgradeState::*;
        matches!(
            (self, next),
            (Selected, Applying)
                | (Selected, Planned)
                | (Applying, Verifying)
                | (Applying, ApplyFailed)
                | (Verifying, Committed)
                | (Verifying, CommitFailed)
                | (Verifying, RevertedCleanly)
                | (Verifying, RevertFailed)
        )
    }

    /// Returns the plain label
    pub fn label(&self) -> &'static str {
        match self {
            UpgradeState::Selected => "selected",
            UpgradeState::Applying => "applying",
            UpgradeState::Verifying => "verifying",
            UpgradeState::Committed => "committed",
            UpgradeState::CommitFailed => "commit failed",
            UpgradeState::RevertedCleanly => "reverted",
            UpgradeState::RevertFailed => "revert failed",
            UpgradeState::ApplyFailed => "apply failed",
            UpgradeState::Planned => "planned",
        }
    }
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One candidate's trip through the upgrade state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeAttempt {
    /// The record being upgraded
    pub record: DependencyRecord,
    /// Manifest section the package is declared in
    pub dependency_type: String,
    /// Installed version to reinstall on revert
    pub previous_version: String,
    /// Manifest entry as declared before the attempt, e.g. `^4.17.0`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_manifest_entry: Option<String>,
    /// Version being applied
    pub target_version: String,
    /// Current state
    pub state: UpgradeState,
    /// Why the attempt ended where it did, for failure states
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When a terminal state was reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl UpgradeAttempt {
    /// Creates an attempt in the `Selected` state
    pub fn new(
        record: DependencyRecord,
        dependency_type: impl Into<String>,
        target_version: impl Into<String>,
    ) -> Self {
        let previous_version = record.current_version.clone();
        Self {
            record,
            dependency_type: dependency_type.into(),
            previous_version,
            previous_manifest_entry: None,
            target_version: target_version.into(),
            state: UpgradeState::Selected,
            note: None,
            finished_at: None,
        }
    }

    /// Remember the manifest entry to restore on revert
    pub fn with_manifest_entry(mut self, spec: impl Into<String>) -> Self {
        self.previous_manifest_entry = Some(spec.into());
        self
    }

    /// Package name
    pub fn package(&self) -> &str {
        &self.record.name
    }

    /// Move to `next`, stamping the finish time on terminal states
    pub fn advance(&mut self, next: UpgradeState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
    }

    /// Move to a terminal failure state and record why
    pub fn fail(&mut self, next: UpgradeState, note: impl Into<String>) {
        self.advance(next);
        self.note = Some(note.into());
    }

    /// Size of the change being applied
    pub fn severity(&self) -> Severity {
        if self.target_version == self.record.wanted_version {
            self.record.wanted_delta
        } else {
            self.record.latest_delta
        }
    }

    /// Returns true if the upgrade ended up committed
    pub fn is_committed(&self) -> bool {
        self.state == UpgradeState::Committed
    }

    /// Commit message used for this attempt
    pub fn commit_message(&self) -> String {
        format!("Update {} to {}", self.record.name, self.target_version)
    }
}

impl fmt::Display for UpgradeAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} → {} ({})",
            self.record.name, self.previous_version, self.target_version, self.state
        )
    }
}
