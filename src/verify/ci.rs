//! Remote CI verification with bounded polling

use super::{CancelSignal, Verdict, Verifier};
use crate::domain::UpgradeAttempt;
use crate::error::VerifyError;
use crate::vcs::VersionControl;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default wait between two status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default number of polls before giving up (30 minutes at 10 s)
pub const DEFAULT_MAX_POLLS: u32 = 180;

/// Coarse pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Running,
    Success,
    Failed,
}

impl PipelineStatus {
    /// Returns true if the pipeline will not change state any more
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineStatus::Running)
    }

    /// Fold the statuses of a pipeline's workflows into one.
    ///
    /// Any failed workflow fails the pipeline; the pipeline succeeds only
    /// once every workflow has succeeded. A pipeline without workflows yet is
    /// still running.
    pub fn from_workflows<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = false;
        let mut all_success = true;
        for status in statuses {
            seen = true;
            match status {
                "success" => {}
                "failed" | "error" | "failing" | "canceled" | "unauthorized" | "not_run" => {
                    return PipelineStatus::Failed
                }
                _ => all_success = false,
            }
        }
        if seen && all_success {
            PipelineStatus::Success
        } else {
            PipelineStatus::Running
        }
    }
}

/// Remote CI operations
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Service name used in messages
    fn name(&self) -> &str;

    /// Start a pipeline for `branch` and return its id
    async fn trigger_pipeline(&self, branch: &str) -> Result<String, VerifyError>;

    /// Current status of a pipeline
    async fn workflow_status(&self, pipeline_id: &str) -> Result<PipelineStatus, VerifyError>;
}

/// How long to wait for a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before each status request
    pub interval: Duration,
    /// Status requests before giving up
    pub max_polls: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

impl PollPolicy {
    /// Upper bound on the time spent waiting
    pub fn deadline(&self) -> Duration {
        self.interval * self.max_polls
    }
}

/// Verifies an upgrade by running the project's CI pipeline.
///
/// The upgrade is still uncommitted when the current branch is pushed, so
/// the pipeline runs against the branch head as last committed, not against
/// the applied upgrade.
pub struct CiVerifier<A: PipelineApi> {
    api: A,
    vcs: Arc<dyn VersionControl>,
    policy: PollPolicy,
    cancel: CancelSignal,
}

impl<A: PipelineApi> CiVerifier<A> {
    /// Create a CI verifier
    pub fn new(api: A, vcs: Arc<dyn VersionControl>, policy: PollPolicy) -> Self {
        Self {
            api,
            vcs,
            policy,
            cancel: CancelSignal::never(),
        }
    }

    /// Stop waiting when `cancel` fires
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Poll `pipeline_id` until it finishes or the policy runs out
    pub async fn wait_for(&self, pipeline_id: &str) -> Result<PipelineStatus, VerifyError> {
        for _ in 0..self.policy.max_polls {
            tokio::select! {
                _ = tokio::time::sleep(self.policy.interval) => {}
                _ = self.cancel.cancelled() => return Err(VerifyError::Cancelled),
            }

            let status = self.api.workflow_status(pipeline_id).await?;
            if status.is_terminal() {
                return Ok(status);
            }
        }

        Err(VerifyError::Timeout {
            pipeline: pipeline_id.to_string(),
            polls: self.policy.max_polls,
        })
    }
}

#[async_trait]
impl<A: PipelineApi> Verifier for CiVerifier<A> {
    fn name(&self) -> &str {
        self.api.name()
    }

    async fn verify(&self, _attempt: &UpgradeAttempt) -> Result<Verdict, VerifyError> {
        let branch = self.vcs.current_branch()?;
        self.vcs.push()?;

        let pipeline_id = self.api.trigger_pipeline(&branch).await?;
        match self.wait_for(&pipeline_id).await? {
            PipelineStatus::Success => Ok(Verdict::Passed),
            _ => Ok(Verdict::failed(format!(
                "{} pipeline {} failed",
                self.api.name(),
                pipeline_id
            ))),
        }
    }
}
