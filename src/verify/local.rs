//! Local test-suite verification

use super::{CancelSignal, Verdict, Verifier};
use crate::domain::UpgradeAttempt;
use crate::error::VerifyError;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Number of trailing output lines kept in a failure reason
const FAILURE_TAIL_LINES: usize = 20;

/// Outcome of one test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    /// Whether the command exited successfully
    pub success: bool,
    /// Combined stdout and stderr
    pub output: String,
}

impl TestOutcome {
    /// Last lines of output, for failure messages
    pub fn tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.output.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}

/// Runs a test command in the project directory
#[derive(Debug, Clone)]
pub struct LocalTestVerifier {
    command: Vec<String>,
    working_dir: PathBuf,
    cancel: CancelSignal,
}

impl LocalTestVerifier {
    /// Create a verifier running `command` (program followed by arguments)
    pub fn new(command: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            working_dir: working_dir.into(),
            cancel: CancelSignal::never(),
        }
    }

    /// Stop the test run when `cancel` fires
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// The configured command line
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    /// Run the test command once
    pub async fn run(&self) -> Result<TestOutcome, VerifyError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(VerifyError::Spawn {
                command: String::new(),
                message: "empty test command".to_string(),
            });
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&self.working_dir)
            .kill_on_drop(true);

        let output = tokio::select! {
            output = command.output() => output.map_err(|e| VerifyError::Spawn {
                command: self.command_line(),
                message: e.to_string(),
            })?,
            _ = self.cancel.cancelled() => return Err(VerifyError::Cancelled),
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(TestOutcome {
            success: output.status.success(),
            output: combined,
        })
    }
}

#[async_trait]
impl Verifier for LocalTestVerifier {
    fn name(&self) -> &str {
        "local tests"
    }

    async fn verify(&self, _attempt: &UpgradeAttempt) -> Result<Verdict, VerifyError> {
        let outcome = self.run().await?;
        if outcome.success {
            Ok(Verdict::Passed)
        } else {
            Ok(Verdict::failed(format!(
                "'{}' failed\n{}",
                self.command_line(),
                outcome.tail(FAILURE_TAIL_LINES)
            )))
        }
    }
}
