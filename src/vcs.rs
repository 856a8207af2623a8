//! Git integration
//!
//! The orchestrator stages, commits and pushes verified upgrades and
//! discards manifest edits of failed ones through [`VersionControl`].

use crate::error::ToolError;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Operations the orchestrator needs from version control
pub trait VersionControl: Send + Sync {
    /// Fails if the tool is missing or the directory is not a repository
    fn ensure_repository(&self) -> Result<(), ToolError>;

    /// Stage every change in the working tree
    fn add_all(&self) -> Result<(), ToolError>;

    /// Commit staged changes
    fn commit(&self, message: &str) -> Result<(), ToolError>;

    /// Push the current branch
    fn push(&self) -> Result<(), ToolError>;

    /// Discard working-tree changes to one path
    fn checkout_path(&self, path: &Path) -> Result<(), ToolError>;

    /// Name of the checked-out branch
    fn current_branch(&self) -> Result<String, ToolError>;
}

/// Version control backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
    verbose: bool,
}

impl GitCli {
    /// Create a git runner for the repository at `repo_path`
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            verbose: false,
        }
    }

    /// Echo every command before running it
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn run_git(&self, args: &[&str]) -> Result<Output, ToolError> {
        let command = format!("git {}", args.join(" "));
        if self.verbose {
            eprintln!("{}", format!("$ {}", command).dimmed());
        }
        Command::new("git")
            .current_dir(&self.repo_path)
            .args(args)
            .output()
            .map_err(|source| ToolError::Spawn { command, source })
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output, ToolError> {
        let output = self.run_git(args)?;
        Self::ensure_success(&output, args)?;
        Ok(output)
    }

    fn ensure_success(output: &Output, args: &[&str]) -> Result<(), ToolError> {
        if output.status.success() {
            return Ok(());
        }

        Err(ToolError::failed(
            format!("git {}", args.join(" ")),
            String::from_utf8_lossy(&output.stderr).trim(),
        ))
    }

    /// Path as git should see it: relative to the repository when possible
    fn repo_relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.repo_path)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

impl VersionControl for GitCli {
    fn ensure_repository(&self) -> Result<(), ToolError> {
        self.run_checked(&["rev-parse", "--is-inside-work-tree"])
            .map(|_| ())
    }

    fn add_all(&self) -> Result<(), ToolError> {
        self.run_checked(&["add", "--all"]).map(|_| ())
    }

    fn commit(&self, message: &str) -> Result<(), ToolError> {
        self.run_checked(&["commit", "-m", message]).map(|_| ())
    }

    fn push(&self) -> Result<(), ToolError> {
        self.run_checked(&["push"]).map(|_| ())
    }

    fn checkout_path(&self, path: &Path) -> Result<(), ToolError> {
        let relative = self.repo_relative(path);
        let relative = relative.to_string_lossy();
        self.run_checked(&["checkout", "--", relative.as_ref()])
            .map(|_| ())
    }

    fn current_branch(&self) -> Result<String, ToolError> {
        let output = self.run_checked(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
