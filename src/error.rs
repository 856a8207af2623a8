//! Application error types using thiserror
//!
//! Error hierarchy:
//! - InputError: manifest or configuration problems (fatal)
//! - FormatError: malformed version strings
//! - SchemaError: malformed outdated reports (aborts one dependency type)
//! - ToolError: package manager or git invocation failures (aborts one candidate)
//! - VerifyError: verification could not produce a verdict (revert path)

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest or configuration input errors
    #[error(transparent)]
    Input(#[from] InputError),

    /// Outdated report schema errors
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// External tool errors
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Verification errors
    #[error(transparent)]
    Verify(#[from] VerifyError),
}

/// Errors related to reading the manifest and the configuration
#[derive(Error, Debug)]
pub enum InputError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    ManifestNotFound { path: PathBuf },

    /// Failed to read a file
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid JSON
    #[error("failed to parse JSON in {path}: {message}")]
    JsonParseError { path: PathBuf, message: String },

    /// Dependency is not declared in the manifest
    #[error("'{package}' is not declared under {dependency_type} in {path}")]
    DependencyNotDeclared {
        path: PathBuf,
        dependency_type: String,
        package: String,
    },

    /// Invalid configuration file or values
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// A version string that cannot be split into major.minor.patch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed version '{version}': expected major.minor.patch")]
pub struct FormatError {
    /// The offending version string
    pub version: String,
}

/// Errors related to the outdated-dependency report layout
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A required column is absent from the report head
    #[error("outdated report is missing required column '{column}'")]
    MissingColumn { column: String },

    /// A row does not have one cell per column
    #[error("outdated report row {row} has {actual} cells, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A version cell could not be classified
    #[error("outdated report row for '{package}': {source}")]
    MalformedVersion {
        package: String,
        #[source]
        source: FormatError,
    },

    /// The tool output did not contain a report
    #[error("no outdated report found in {tool} output: {message}")]
    Unreadable { tool: String, message: String },
}

/// Errors raised by external command-line tools
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool could not be started
    #[error("failed to execute '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully
    #[error("'{command}' failed: {stderr}")]
    Failed { command: String, stderr: String },

    /// An argument was refused before running the tool
    #[error("refusing to pass unsafe argument '{argument}' to {tool}")]
    UnsafeArgument { tool: String, argument: String },
}

/// Errors that prevent a verification from reaching a verdict
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The test command could not be started
    #[error("failed to start test command '{command}': {message}")]
    Spawn { command: String, message: String },

    /// CI API unreachable or answered with an unexpected status
    #[error("CI request to {endpoint} failed: {message}")]
    Network { endpoint: String, message: String },

    /// CI pipeline did not finish within the polling budget
    #[error("pipeline {pipeline} still running after {polls} polls")]
    Timeout { pipeline: String, polls: u32 },

    /// Waiting was interrupted by the user
    #[error("verification cancelled")]
    Cancelled,

    /// Pushing the branch before triggering CI failed
    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl InputError {
    /// Creates a new ManifestNotFound error
    pub fn manifest_not_found(path: impl Into<PathBuf>) -> Self {
        InputError::ManifestNotFound { path: path.into() }
    }

    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InputError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InputError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new InvalidConfig error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        InputError::InvalidConfig {
            message: message.into(),
        }
    }
}

impl FormatError {
    /// Creates a new FormatError
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl SchemaError {
    /// Creates a new MissingColumn error
    pub fn missing_column(column: impl Into<String>) -> Self {
        SchemaError::MissingColumn {
            column: column.into(),
        }
    }

    /// Creates a new Unreadable error
    pub fn unreadable(tool: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Unreadable {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

impl ToolError {
    /// Creates a new Failed error
    pub fn failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        ToolError::Failed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }
}

impl VerifyError {
    /// Creates a new Network error
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        VerifyError::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Returns true if the user interrupted the verification
    pub fn is_cancelled(&self) -> bool {
        matches!(self, VerifyError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_not_found_display() {
        let err = InputError::manifest_not_found("/path/to/package.json");
        assert_eq!(
            err.to_string(),
            "manifest file not found: /path/to/package.json"
        );
    }

    #[test]
    fn test_read_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = InputError::read_error("/path/to/package.json", io_err);
        let msg = err.to_string();
        assert!(msg.contains("failed to read"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_format_error_display() {
        let err = FormatError::new("1.2");
        assert_eq!(
            err.to_string(),
            "malformed version '1.2': expected major.minor.patch"
        );
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::missing_column("Wanted");
        assert!(err.to_string().contains("'Wanted'"));

        let err = SchemaError::RowLength {
            row: 2,
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "outdated report row 2 has 3 cells, expected 4"
        );
    }

    #[test]
    fn test_schema_error_wraps_format_error() {
        let err = SchemaError::MalformedVersion {
            package: "lodash".to_string(),
            source: FormatError::new("4"),
        };
        let msg = err.to_string();
        assert!(msg.contains("lodash"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::failed("yarn upgrade lodash@4.17.21", "network down");
        assert_eq!(
            err.to_string(),
            "'yarn upgrade lodash@4.17.21' failed: network down"
        );
    }

    #[test]
    fn test_verify_error_display() {
        let err = VerifyError::Timeout {
            pipeline: "abc".to_string(),
            polls: 3,
        };
        assert_eq!(err.to_string(), "pipeline abc still running after 3 polls");
        assert!(!err.is_cancelled());
        assert!(VerifyError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_app_error_from_input_error() {
        let app_err: AppError = InputError::manifest_not_found("package.json").into();
        assert!(app_err.to_string().contains("manifest file not found"));
    }

    #[test]
    fn test_app_error_from_tool_error() {
        let app_err: AppError = ToolError::failed("git push", "rejected").into();
        assert!(app_err.to_string().contains("git push"));
    }

    #[test]
    fn test_error_debug_trait() {
        let err = InputError::manifest_not_found("/test");
        let debug = format!("{:?}", err);
        assert!(debug.contains("ManifestNotFound"));
    }
}
