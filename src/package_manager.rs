//! Package manager integration
//!
//! This module provides:
//! - The [`PackageManager`] collaborator used by the orchestrator
//! - Detection of the project's Node.js package manager from lockfiles
//! - Typed parsing of `outdated --json` output for yarn, npm and pnpm

use crate::domain::{OutdatedReport, OutdatedTable, COLUMN_PACKAGE_TYPE};
use crate::error::{AppError, SchemaError, ToolError};
use colored::Colorize;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::str::FromStr;
use std::sync::LazyLock;

static PACKAGE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(@[A-Za-z0-9][\w.-]*/)?[A-Za-z0-9][\w.-]*$").unwrap()
});
static VERSION_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][\w.+-]*$").unwrap());

/// Operations the orchestrator needs from a package manager
pub trait PackageManager {
    /// Tool name used in messages
    fn name(&self) -> &str;

    /// Outdated packages declared under `dependency_type`
    fn outdated(&self, dependency_type: &str) -> Result<OutdatedReport, AppError>;

    /// Move `package` to `version`
    fn upgrade(&self, package: &str, version: &str) -> Result<(), ToolError>;

    /// Pin `package` at `version` under `dependency_type`; used to revert
    fn add(&self, package: &str, version: &str, dependency_type: &str) -> Result<(), ToolError>;
}

/// Supported Node.js package managers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePackageManager {
    Yarn,
    Npm,
    Pnpm,
}

impl NodePackageManager {
    /// Detect the package manager from lockfiles, preferring yarn
    pub fn detect(working_dir: &Path) -> Self {
        if working_dir.join("yarn.lock").exists() {
            return NodePackageManager::Yarn;
        }
        if working_dir.join("pnpm-lock.yaml").exists() {
            return NodePackageManager::Pnpm;
        }
        if working_dir.join("package-lock.json").exists() {
            return NodePackageManager::Npm;
        }
        NodePackageManager::Yarn
    }

    /// Executable name
    pub fn program(&self) -> &'static str {
        match self {
            NodePackageManager::Yarn => "yarn",
            NodePackageManager::Npm => "npm",
            NodePackageManager::Pnpm => "pnpm",
        }
    }

    fn outdated_args(&self) -> Vec<&'static str> {
        match self {
            NodePackageManager::Yarn => vec!["outdated", "--json"],
            NodePackageManager::Npm => vec!["outdated", "--json", "--long"],
            NodePackageManager::Pnpm => vec!["outdated", "--format", "json"],
        }
    }

    fn upgrade_args(&self, spec: &str) -> Vec<String> {
        let verb = match self {
            NodePackageManager::Yarn => "upgrade",
            NodePackageManager::Npm => "install",
            NodePackageManager::Pnpm => "update",
        };
        vec![verb.to_string(), spec.to_string()]
    }

    fn add_args(&self, spec: &str, dev: bool) -> Vec<String> {
        let verb = match self {
            NodePackageManager::Npm => "install",
            NodePackageManager::Yarn | NodePackageManager::Pnpm => "add",
        };
        let mut args = vec![verb.to_string(), spec.to_string()];
        if dev {
            args.push(match self {
                NodePackageManager::Npm => "--save-dev".to_string(),
                NodePackageManager::Yarn | NodePackageManager::Pnpm => "--dev".to_string(),
            });
        }
        args
    }

    /// Parse this tool's `outdated` JSON output
    pub fn parse_outdated(&self, stdout: &str) -> Result<Option<OutdatedReport>, SchemaError> {
        match self {
            NodePackageManager::Yarn => parse_yarn_outdated(stdout),
            NodePackageManager::Npm | NodePackageManager::Pnpm => {
                parse_object_outdated(self.program(), stdout).map(Some)
            }
        }
    }
}

impl fmt::Display for NodePackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program())
    }
}

impl FromStr for NodePackageManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yarn" => Ok(NodePackageManager::Yarn),
            "npm" => Ok(NodePackageManager::Npm),
            "pnpm" => Ok(NodePackageManager::Pnpm),
            other => Err(format!(
                "unsupported package manager '{}': expected 'yarn', 'npm' or 'pnpm'",
                other
            )),
        }
    }
}

/// Package manager that runs the real tool in the project directory
#[derive(Debug, Clone)]
pub struct SystemPackageManager {
    kind: NodePackageManager,
    working_dir: PathBuf,
    verbose: bool,
}

impl SystemPackageManager {
    /// Create a package manager of the given kind
    pub fn new(kind: NodePackageManager, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            working_dir: working_dir.into(),
            verbose: false,
        }
    }

    /// Create a package manager detected from the project's lockfiles
    pub fn detect(working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        Self::new(NodePackageManager::detect(&working_dir), working_dir)
    }

    /// Echo every command before running it
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The detected or configured tool
    pub fn kind(&self) -> NodePackageManager {
        self.kind
    }

    fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<Output, ToolError> {
        let command = self.describe(args);
        if self.verbose {
            eprintln!("{}", format!("$ {}", command).dimmed());
        }
        Command::new(self.kind.program())
            .args(args.iter().map(|a| a.as_ref()))
            .current_dir(&self.working_dir)
            .output()
            .map_err(|source| ToolError::Spawn { command, source })
    }

    fn run_checked(&self, args: &[String]) -> Result<(), ToolError> {
        let output = self.run(args)?;
        if output.status.success() {
            return Ok(());
        }
        Err(ToolError::failed(
            self.describe(args),
            String::from_utf8_lossy(&output.stderr).trim(),
        ))
    }

    fn describe<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut parts = vec![self.kind.program()];
        parts.extend(args.iter().map(|a| a.as_ref()));
        parts.join(" ")
    }

    fn package_spec(&self, package: &str, version: &str) -> Result<String, ToolError> {
        for (argument, re) in [(package, &*PACKAGE_NAME_RE), (version, &*VERSION_ARG_RE)] {
            if !re.is_match(argument) {
                return Err(ToolError::UnsafeArgument {
                    tool: self.kind.program().to_string(),
                    argument: argument.to_string(),
                });
            }
        }
        Ok(format!("{}@{}", package, version))
    }
}

impl PackageManager for SystemPackageManager {
    fn name(&self) -> &str {
        self.kind.program()
    }

    fn outdated(&self, dependency_type: &str) -> Result<OutdatedReport, AppError> {
        let args = self.kind.outdated_args();
        let output = self.run(&args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        // outdated exits non-zero whenever something is outdated
        let report = match self.kind.parse_outdated(&stdout)? {
            Some(report) => report,
            None if output.status.success() => OutdatedReport::default(),
            None => {
                return Err(ToolError::failed(
                    self.describe(&args),
                    String::from_utf8_lossy(&output.stderr).trim(),
                )
                .into())
            }
        };

        Ok(report.retain_rows(COLUMN_PACKAGE_TYPE, |t| {
            t.is_empty() || t == dependency_type
        }))
    }

    fn upgrade(&self, package: &str, version: &str) -> Result<(), ToolError> {
        let spec = self.package_spec(package, version)?;
        self.run_checked(&self.kind.upgrade_args(&spec))
    }

    fn add(&self, package: &str, version: &str, dependency_type: &str) -> Result<(), ToolError> {
        let spec = self.package_spec(package, version)?;
        let dev = dependency_type == "devDependencies";
        self.run_checked(&self.kind.add_args(&spec, dev))
    }
}

/// Find the `table` event in yarn's line-delimited JSON output.
///
/// Returns `Ok(None)` when no table was printed, which yarn does when
/// nothing is outdated.
pub fn parse_yarn_outdated(stdout: &str) -> Result<Option<OutdatedReport>, SchemaError> {
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Ok(event) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if event.get("type").and_then(Value::as_str) != Some("table") {
            continue;
        }
        let table: OutdatedTable = serde_json::from_value(event)
            .map_err(|e| SchemaError::unreadable("yarn", e.to_string()))?;
        return Ok(Some(table.data));
    }
    Ok(None)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutdatedEntry {
    current: Option<String>,
    wanted: String,
    latest: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    dependency_type: Option<String>,
}

/// Convert npm/pnpm `outdated` JSON (an object keyed by package name) into a
/// table with yarn's column names.
///
/// Packages that are declared but not installed have no current version and
/// are left out.
pub fn parse_object_outdated(tool: &str, stdout: &str) -> Result<OutdatedReport, SchemaError> {
    let head: Vec<String> = ["Package", "Current", "Wanted", "Latest", COLUMN_PACKAGE_TYPE]
        .iter()
        .map(|c| c.to_string())
        .collect();

    if stdout.trim().is_empty() {
        return Ok(OutdatedReport::new(head, Vec::new()));
    }

    let raw: Map<String, Value> =
        serde_json::from_str(stdout).map_err(|e| SchemaError::unreadable(tool, e.to_string()))?;
    let entries: BTreeMap<String, OutdatedEntry> = raw
        .into_iter()
        .map(|(name, value)| {
            serde_json::from_value(value)
                .map(|entry| (name.clone(), entry))
                .map_err(|e| SchemaError::unreadable(tool, format!("{}: {}", name, e)))
        })
        .collect::<Result<_, _>>()?;

    let body = entries
        .into_iter()
        .filter_map(|(name, entry)| {
            let current = entry.current?;
            let package_type = entry.kind.or(entry.dependency_type).unwrap_or_default();
            Some(vec![name, current, entry.wanted, entry.latest, package_type])
        })
        .collect();

    Ok(OutdatedReport::new(head, body))
}
