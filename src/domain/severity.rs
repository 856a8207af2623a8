//! Version delta classification

use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How large a version change is, ordered by risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Versions are identical
    None,
    /// Only the third component (or a suffix after it) changed
    Patch,
    /// The second component changed
    Minor,
    /// The first component changed
    Major,
}

impl Severity {
    /// Returns the plain label
    pub fn label(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Patch => "patch",
            Severity::Minor => "minor",
            Severity::Major => "major",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Classify the change from `current` to `target`.
///
/// Components are compared as opaque strings, so `"1.02.0"` and `"1.2.0"`
/// differ in their minor component. Identical strings are `None` whatever
/// their shape; otherwise both versions must have at least three
/// dot-separated components.
pub fn classify(current: &str, target: &str) -> Result<Severity, FormatError> {
    if current == target {
        return Ok(Severity::None);
    }

    let current_parts = split_components(current)?;
    let target_parts = split_components(target)?;

    if current_parts[0] != target_parts[0] {
        Ok(Severity::Major)
    } else if current_parts[1] != target_parts[1] {
        Ok(Severity::Minor)
    } else {
        Ok(Severity::Patch)
    }
}

fn split_components(version: &str) -> Result<Vec<&str>, FormatError> {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() < 3 {
        return Err(FormatError::new(version));
    }
    Ok(parts)
}
