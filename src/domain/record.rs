//! Outdated dependency records

use super::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One outdated package, as reported by the package manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// Package name
    pub name: String,
    /// Installed version
    pub current_version: String,
    /// Highest version allowed by the declared range
    pub wanted_version: String,
    /// Highest published version
    pub latest_version: String,
    /// Change from current to wanted
    pub wanted_delta: Severity,
    /// Change from current to latest
    pub latest_delta: Severity,
    /// Dependency section the package belongs to, when the report says so
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_type: Option<String>,
}

impl DependencyRecord {
    /// Returns the severity selected by `field`
    pub fn delta(&self, field: DeltaField) -> Severity {
        match field {
            DeltaField::Wanted => self.wanted_delta,
            DeltaField::Latest => self.latest_delta,
        }
    }

    /// Returns the version selected by `field`
    pub fn target_version(&self, field: DeltaField) -> &str {
        match field {
            DeltaField::Wanted => &self.wanted_version,
            DeltaField::Latest => &self.latest_version,
        }
    }
}

impl fmt::Display for DependencyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (wanted {} [{}], latest {} [{}])",
            self.name,
            self.current_version,
            self.wanted_version,
            self.wanted_delta,
            self.latest_version,
            self.latest_delta
        )
    }
}

/// Which delta of a record drives grouping and upgrade targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaField {
    /// The version the declared range resolves to
    Wanted,
    /// The newest published version
    Latest,
}
