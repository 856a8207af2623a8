//! Upgrade strategy

use super::DeltaField;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How far an upgrade is allowed to move a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Stay inside the declared range: group and upgrade by the wanted version
    #[default]
    Conservative,
    /// Chase the newest release: group and upgrade by the latest version
    Aggressive,
}

impl Strategy {
    /// Delta field that drives grouping and targets
    pub fn delta_field(&self) -> DeltaField {
        match self {
            Strategy::Conservative => DeltaField::Wanted,
            Strategy::Aggressive => DeltaField::Latest,
        }
    }

    /// Returns the plain label
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Conservative => "conservative",
            Strategy::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" | "wanted" => Ok(Strategy::Conservative),
            "aggressive" | "latest" => Ok(Strategy::Aggressive),
            other => Err(format!(
                "invalid strategy '{}': expected 'conservative' or 'aggressive'",
                other
            )),
        }
    }
}
