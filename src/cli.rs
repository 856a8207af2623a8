//! CLI argument parsing module for safeup

use crate::config::{Config, VerifyMode, CONFIG_FILENAME};
use crate::domain::Strategy;
use crate::orchestrator::RunOptions;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Reject blank test commands
fn parse_command(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("empty test command".to_string());
    }
    Ok(s.trim().to_string())
}

/// Patch-level dependency upgrader with verification and rollback
#[derive(Parser, Debug, Clone)]
#[command(
    name = "safeup",
    version,
    about = "Apply patch-level dependency upgrades one at a time, keeping only those that pass verification"
)]
pub struct CliArgs {
    /// Project directory (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Configuration file (default: <PATH>/safeup.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    // Upgrade options
    /// Target the wanted version (conservative) or the latest one (aggressive)
    #[arg(long, value_parser = clap::value_parser!(Strategy))]
    pub strategy: Option<Strategy>,

    /// Verify with the local test command or a CI pipeline
    #[arg(long, value_parser = clap::value_parser!(VerifyMode))]
    pub verify: Option<VerifyMode>,

    /// Test command used for local verification (e.g. "yarn test")
    #[arg(long, value_parser = parse_command)]
    pub test_command: Option<String>,

    // Package filters
    /// Exclude specific packages (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Consider only specific packages (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub only: Vec<String>,

    // General options
    /// Dry run mode - show what would be upgraded without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Configuration file to read
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.path.join(CONFIG_FILENAME))
    }

    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(mode) = self.verify {
            config.verify.mode = mode;
        }
        if let Some(command) = &self.test_command {
            config.verify.test_command = command.split_whitespace().map(str::to_string).collect();
        }
    }

    /// Orchestrator settings from the merged configuration and the filters
    pub fn run_options(&self, config: &Config) -> RunOptions {
        RunOptions {
            strategy: config.strategy,
            dependency_types: config.dependency_types.clone(),
            only: self.only.clone(),
            exclude: self.exclude.clone(),
            dry_run: self.dry_run,
        }
    }
}
