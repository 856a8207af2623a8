//! Verification backends
//!
//! An upgrade is kept only if a verifier says it is safe. Two backends exist:
//! - [`LocalTestVerifier`] runs the project's test command
//! - [`CiVerifier`] pushes the branch, triggers a CI pipeline and polls it

mod ci;
mod circleci;
mod local;

pub use ci::{CiVerifier, PipelineApi, PipelineStatus, PollPolicy};
pub use circleci::{CircleCiClient, DEFAULT_API_BASE};
pub use local::{LocalTestVerifier, TestOutcome};

use crate::domain::UpgradeAttempt;
use crate::error::VerifyError;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::watch;

/// Result of a verification that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The upgrade is safe to commit
    Passed,
    /// The upgrade broke something
    Failed { reason: String },
}

impl Verdict {
    /// Creates a Failed verdict
    pub fn failed(reason: impl Into<String>) -> Self {
        Verdict::Failed {
            reason: reason.into(),
        }
    }

    /// Returns true if the upgrade may be committed
    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Passed => write!(f, "passed"),
            Verdict::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Confirms an applied upgrade is safe
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Backend name used in messages
    fn name(&self) -> &str;

    /// Check the working tree with `attempt` applied
    async fn verify(&self, attempt: &UpgradeAttempt) -> Result<Verdict, VerifyError>;
}

/// Sending half of a cancellation signal
#[derive(Debug)]
pub struct CancelTrigger {
    tx: watch::Sender<bool>,
}

impl CancelTrigger {
    /// Cancel every waiting verification
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving half of a cancellation signal
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    /// Returns true once cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is requested; never resolves if the
    /// trigger is dropped without firing
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a connected trigger/signal pair
pub fn cancellation() -> (CancelTrigger, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelTrigger { tx }, CancelSignal { rx })
}
