//! package.json manifest held in memory
//!
//! The manifest is read once at startup. Version changes are applied to the
//! in-memory copy and only reach the disk through [`Manifest::save`], which
//! the orchestrator calls after a verified upgrade.

mod package_json;

pub use package_json::{replace_spec, replace_version, split_range};

use crate::error::InputError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Default manifest file name
pub const MANIFEST_FILENAME: &str = "package.json";

/// In-memory package.json
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    content: String,
    json: Value,
}

impl Manifest {
    /// Read and parse the manifest at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InputError::manifest_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| InputError::read_error(path, e))?;
        Self::parse(path, content)
    }

    /// Build a manifest from already-read content
    pub fn parse(path: impl Into<PathBuf>, content: impl Into<String>) -> Result<Self, InputError> {
        let path = path.into();
        let content = content.into();
        let json = serde_json::from_str(&content).map_err(|e| InputError::JsonParseError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            path,
            content,
            json,
        })
    }

    /// Path the manifest was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw text as it would be written by [`Manifest::save`]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns true if `dependency_type` is a section of the manifest
    pub fn has_section(&self, dependency_type: &str) -> bool {
        self.json
            .get(dependency_type)
            .map(Value::is_object)
            .unwrap_or(false)
    }

    /// Declared version spec, e.g. `^4.17.20`
    pub fn spec_of(&self, dependency_type: &str, package: &str) -> Option<&str> {
        self.json.get(dependency_type)?.get(package)?.as_str()
    }

    /// Declared version without its range operator, e.g. `4.17.20`
    pub fn version_of(&self, dependency_type: &str, package: &str) -> Option<&str> {
        self.spec_of(dependency_type, package)
            .map(|spec| split_range(spec).1)
    }

    /// Returns true if `package` is declared under `dependency_type`
    pub fn declares(&self, dependency_type: &str, package: &str) -> bool {
        self.spec_of(dependency_type, package).is_some()
    }

    /// Point `package` at `version`, keeping the declared range operator
    pub fn set_version(
        &mut self,
        dependency_type: &str,
        package: &str,
        version: &str,
    ) -> Result<(), InputError> {
        let updated = replace_version(&self.content, dependency_type, package, version)
            .ok_or_else(|| self.not_declared(dependency_type, package))?;
        self.replace_content(updated)
    }

    /// Set the declared spec of `package` verbatim, e.g. back to `^4.17.0`
    pub fn set_spec(
        &mut self,
        dependency_type: &str,
        package: &str,
        spec: &str,
    ) -> Result<(), InputError> {
        let updated = replace_spec(&self.content, dependency_type, package, spec)
            .ok_or_else(|| self.not_declared(dependency_type, package))?;
        self.replace_content(updated)
    }

    /// Re-read the manifest from disk, dropping in-memory edits
    pub fn reload(&mut self) -> Result<(), InputError> {
        *self = Self::load(&self.path)?;
        Ok(())
    }

    fn not_declared(&self, dependency_type: &str, package: &str) -> InputError {
        InputError::DependencyNotDeclared {
            path: self.path.clone(),
            dependency_type: dependency_type.to_string(),
            package: package.to_string(),
        }
    }

    fn replace_content(&mut self, updated: String) -> Result<(), InputError> {
        let json = serde_json::from_str(&updated).map_err(|e| InputError::JsonParseError {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        self.content = updated;
        self.json = json;
        Ok(())
    }

    /// Write the in-memory content back to disk
    pub fn save(&self) -> Result<(), InputError> {
        fs::write(&self.path, &self.content).map_err(|e| InputError::write_error(&self.path, e))
    }
}
