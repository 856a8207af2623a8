//! Outdated report normalization
//!
//! Package managers report outdated packages as a table: an ordered list of
//! column names and rows of cells aligned to it. This module turns such a
//! table into [`DependencyRecord`]s with computed deltas.

use super::{classify, DependencyRecord};
use crate::error::SchemaError;
use serde::{Deserialize, Serialize};

/// Column holding the package name
pub const COLUMN_PACKAGE: &str = "Package";
/// Column holding the installed version
pub const COLUMN_CURRENT: &str = "Current";
/// Column holding the in-range version
pub const COLUMN_WANTED: &str = "Wanted";
/// Column holding the newest version
pub const COLUMN_LATEST: &str = "Latest";
/// Optional column holding the dependency section
pub const COLUMN_PACKAGE_TYPE: &str = "Package Type";

/// Columns every report must carry
pub const REQUIRED_COLUMNS: [&str; 4] = [COLUMN_PACKAGE, COLUMN_CURRENT, COLUMN_WANTED, COLUMN_LATEST];

/// Tabular outdated-dependency report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutdatedReport {
    /// Ordered column names
    pub head: Vec<String>,
    /// Rows of cells aligned to `head`
    pub body: Vec<Vec<String>>,
}

/// Wire shape of a table event: `{ "data": { "head": [...], "body": [...] } }`
#[derive(Debug, Deserialize)]
pub struct OutdatedTable {
    pub data: OutdatedReport,
}

impl OutdatedReport {
    /// Creates a report from a head and rows
    pub fn new(head: Vec<String>, body: Vec<Vec<String>>) -> Self {
        Self { head, body }
    }

    /// Returns true if the report has no rows
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Position of a column in `head`
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.head.iter().position(|c| c == column)
    }

    /// Keep only rows whose `column` cell satisfies `keep`.
    ///
    /// Reports without that column are returned unchanged.
    pub fn retain_rows<F>(mut self, column: &str, mut keep: F) -> Self
    where
        F: FnMut(&str) -> bool,
    {
        if let Some(index) = self.column_index(column) {
            self.body
                .retain(|row| row.get(index).map(|cell| keep(cell)).unwrap_or(true));
        }
        self
    }
}

/// Build one record per report row.
///
/// A report with neither columns nor rows means nothing is outdated.
pub fn normalize(report: &OutdatedReport) -> Result<Vec<DependencyRecord>, SchemaError> {
    if report.head.is_empty() && report.body.is_empty() {
        return Ok(Vec::new());
    }

    let column = |name: &str| {
        report
            .column_index(name)
            .ok_or_else(|| SchemaError::missing_column(name))
    };

    let package = column(COLUMN_PACKAGE)?;
    let current = column(COLUMN_CURRENT)?;
    let wanted = column(COLUMN_WANTED)?;
    let latest = column(COLUMN_LATEST)?;
    let package_type = report.column_index(COLUMN_PACKAGE_TYPE);

    let mut records = Vec::with_capacity(report.body.len());

    for (row_index, row) in report.body.iter().enumerate() {
        if row.len() != report.head.len() {
            return Err(SchemaError::RowLength {
                row: row_index,
                expected: report.head.len(),
                actual: row.len(),
            });
        }

        let name = row[package].clone();
        let current_version = row[current].clone();
        let wanted_version = row[wanted].clone();
        let latest_version = row[latest].clone();

        let malformed = |source| SchemaError::MalformedVersion {
            package: name.clone(),
            source,
        };
        let wanted_delta = classify(&current_version, &wanted_version).map_err(malformed)?;
        let latest_delta = classify(&current_version, &latest_version).map_err(malformed)?;

        records.push(DependencyRecord {
            name,
            current_version,
            wanted_version,
            latest_version,
            wanted_delta,
            latest_delta,
            package_type: package_type.map(|i| row[i].clone()),
        });
    }

    Ok(records)
}
