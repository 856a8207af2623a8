//! Candidate grouping by severity and name prefix

use super::{DeltaField, DependencyRecord, Severity};
use serde::{Deserialize, Serialize};

/// Key of a candidate group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    /// Severity of every member under the chosen delta field
    pub severity: Severity,
    /// Package name up to the first hyphen
    pub prefix: String,
}

/// Records sharing a severity and a name prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateGroup {
    pub key: GroupKey,
    /// Members in input order
    pub members: Vec<DependencyRecord>,
}

impl CandidateGroup {
    /// Returns the group's severity
    pub fn severity(&self) -> Severity {
        self.key.severity
    }

    /// Returns the group's name prefix
    pub fn prefix(&self) -> &str {
        &self.key.prefix
    }

    /// The member acted on in a run. Other members wait for a later run.
    pub fn representative(&self) -> Option<&DependencyRecord> {
        self.members.first()
    }

    /// Returns the number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the group has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Name prefix used for grouping: everything before the first `-`.
///
/// Scoped names are not special-cased, so `@babel/core` and `@babel/preset-env`
/// land in different groups (`@babel/core` and `@babel/preset`).
pub fn name_prefix(name: &str) -> &str {
    name.split('-').next().unwrap_or(name)
}

/// Partition `records` into groups keyed by (severity, prefix).
///
/// Records are stably sorted by the severity named by `field`, so groups come
/// out ordered from `None` to `Major` and, within one severity, in the order
/// their first member appeared in the input.
pub fn group(records: &[DependencyRecord], field: DeltaField) -> Vec<CandidateGroup> {
    let mut sorted: Vec<&DependencyRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.delta(field));

    let mut groups: Vec<CandidateGroup> = Vec::new();

    for record in sorted {
        let key = GroupKey {
            severity: record.delta(field),
            prefix: name_prefix(&record.name).to_string(),
        };

        match groups.iter_mut().find(|g| g.key == key) {
            Some(existing) => existing.members.push(record.clone()),
            None => groups.push(CandidateGroup {
                key,
                members: vec![record.clone()],
            }),
        }
    }

    groups
}
