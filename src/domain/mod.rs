//! Core domain models for safeup
//!
//! This module contains the fundamental types used throughout the application:
//! - Severity classification of version changes
//! - Outdated reports and the records normalized from them
//! - Candidate groups keyed by severity and name prefix
//! - Upgrade attempts and their state machine
//! - Summary and result structures

mod attempt;
mod group;
mod record;
mod report;
mod severity;
mod strategy;
mod summary;

pub use attempt::{UpgradeAttempt, UpgradeState};
pub use group::{group, name_prefix, CandidateGroup, GroupKey};
pub use record::{DeltaField, DependencyRecord};
pub use report::{
    normalize, OutdatedReport, OutdatedTable, COLUMN_CURRENT, COLUMN_LATEST, COLUMN_PACKAGE,
    COLUMN_PACKAGE_TYPE, COLUMN_WANTED, REQUIRED_COLUMNS,
};
pub use severity::{classify, Severity};
pub use strategy::Strategy;
pub use summary::{DependencyTypeResult, RunSummary};
