//! Configuration file handling
//!
//! `safeup.toml` in the project directory is optional; every key has a
//! default and command-line flags override file values.

use crate::domain::Strategy;
use crate::error::InputError;
use crate::manifest::MANIFEST_FILENAME;
use crate::package_manager::NodePackageManager;
use crate::verify::{PollPolicy, DEFAULT_API_BASE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default configuration file name
pub const CONFIG_FILENAME: &str = "safeup.toml";

/// Default environment variable holding the CI token
pub const DEFAULT_TOKEN_ENV: &str = "CIRCLECI_TOKEN";

/// How upgrades are verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// Run the test command in the project directory
    #[default]
    Local,
    /// Push and wait for a CI pipeline
    Ci,
}

impl FromStr for VerifyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(VerifyMode::Local),
            "ci" => Ok(VerifyMode::Ci),
            other => Err(format!(
                "unknown verify mode '{}': expected 'local' or 'ci'",
                other
            )),
        }
    }
}

/// `[verify]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    pub mode: VerifyMode,
    /// Program followed by its arguments
    pub test_command: Vec<String>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            mode: VerifyMode::Local,
            test_command: ["yarn", "docker:test", "backend"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// `[ci]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CiConfig {
    /// Project slug such as `gh/org/repo`
    pub project_slug: Option<String>,
    pub api_base: String,
    /// Name of the environment variable holding the API token
    pub token_env: String,
    pub poll_interval_secs: u64,
    pub max_polls: u32,
}

impl Default for CiConfig {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            project_slug: None,
            api_base: DEFAULT_API_BASE.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            poll_interval_secs: policy.interval.as_secs(),
            max_polls: policy.max_polls,
        }
    }
}

impl CiConfig {
    /// Polling bounds for the CI verifier
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_polls: self.max_polls,
        }
    }

    /// Read the API token from the configured environment variable
    pub fn token(&self) -> Result<String, InputError> {
        match std::env::var(&self.token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(InputError::invalid_config(format!(
                "CI verification needs a token in ${}",
                self.token_env
            ))),
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Manifest path, relative to the project directory
    pub manifest: PathBuf,
    /// Manifest sections to process, in order
    pub dependency_types: Vec<String>,
    pub strategy: Strategy,
    /// Detected from lockfiles when unset
    pub package_manager: Option<String>,
    pub verify: VerifyConfig,
    pub ci: CiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from(MANIFEST_FILENAME),
            dependency_types: vec!["dependencies".to_string(), "devDependencies".to_string()],
            strategy: Strategy::default(),
            package_manager: None,
            verify: VerifyConfig::default(),
            ci: CiConfig::default(),
        }
    }
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, InputError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| InputError::read_error(path, e))?;
        Self::parse(&content)
            .map_err(|e| InputError::invalid_config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.message().to_string())
    }

    /// Manifest path resolved against the project directory
    pub fn manifest_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.manifest)
    }

    /// Configured package manager, if any
    pub fn package_manager(&self) -> Result<Option<NodePackageManager>, InputError> {
        self.package_manager
            .as_deref()
            .map(|name| name.parse().map_err(InputError::invalid_config))
            .transpose()
    }

    /// Check values that cannot be expressed in the file's types
    pub fn validate(&self) -> Result<(), InputError> {
        if self.dependency_types.is_empty() {
            return Err(InputError::invalid_config(
                "dependency_types must name at least one section",
            ));
        }
        self.package_manager()?;

        match self.verify.mode {
            VerifyMode::Local => {
                if self.verify.test_command.is_empty() {
                    return Err(InputError::invalid_config(
                        "verify.test_command must not be empty",
                    ));
                }
            }
            VerifyMode::Ci => {
                if self.ci.project_slug.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(InputError::invalid_config(
                        "CI verification needs ci.project_slug",
                    ));
                }
                if self.ci.max_polls == 0 {
                    return Err(InputError::invalid_config("ci.max_polls must be at least 1"));
                }
                self.ci.token()?;
            }
        }
        Ok(())
    }
}
