//! Upgrade orchestrator for coordinating the whole upgrade workflow
//!
//! This module provides:
//! - Workflow coordination: outdated → normalize → group → select → apply →
//!   verify → commit or revert
//! - Dry-run mode support
//! - Package filter application
//! - Error handling with partial continuation: a bad report aborts one
//!   dependency type, a failed tool call aborts one candidate

use crate::domain::{
    group, normalize, CandidateGroup, DependencyRecord, DependencyTypeResult, RunSummary, Severity,
    Strategy, UpgradeAttempt, UpgradeState,
};
use crate::error::{AppError, VerifyError};
use crate::manifest::Manifest;
use crate::package_manager::PackageManager;
use crate::progress::Progress;
use crate::vcs::VersionControl;
use crate::verify::{CancelSignal, Verdict, Verifier};

/// Run-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Which delta drives grouping and which version is targeted
    pub strategy: Strategy,
    /// Manifest sections to process, in order
    pub dependency_types: Vec<String>,
    /// Only consider these packages (empty means all)
    pub only: Vec<String>,
    /// Never consider these packages
    pub exclude: Vec<String>,
    /// Select candidates without applying anything
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            dependency_types: vec!["dependencies".to_string(), "devDependencies".to_string()],
            only: Vec::new(),
            exclude: Vec::new(),
            dry_run: false,
        }
    }
}

impl RunOptions {
    /// Check if a package passes the --only/--exclude filters
    pub fn should_process_package(&self, name: &str) -> bool {
        if !self.only.is_empty() {
            return self.only.iter().any(|p| p == name);
        }
        !self.exclude.iter().any(|p| p == name)
    }
}

/// Orchestrator for the upgrade workflow
///
/// Collaborators are borrowed so callers keep access to them after the run.
/// The orchestrator owns the manifest and is its only writer.
pub struct Orchestrator<'a> {
    package_manager: &'a dyn PackageManager,
    vcs: &'a dyn VersionControl,
    verifier: &'a dyn Verifier,
    manifest: Manifest,
    options: RunOptions,
    cancel: CancelSignal,
    progress: Progress,
    halted: Option<String>,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator
    pub fn new(
        package_manager: &'a dyn PackageManager,
        vcs: &'a dyn VersionControl,
        verifier: &'a dyn Verifier,
        manifest: Manifest,
        options: RunOptions,
    ) -> Self {
        Self {
            package_manager,
            vcs,
            verifier,
            manifest,
            options,
            cancel: CancelSignal::never(),
            progress: Progress::disabled(),
            halted: None,
        }
    }

    /// Stop before the next candidate once `cancel` fires
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report progress through `progress`
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// The manifest as the orchestrator last left it
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Run the upgrade workflow over every configured dependency type
    pub async fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::new(self.options.strategy, self.options.dry_run);

        let dependency_types = self.options.dependency_types.clone();
        for dependency_type in &dependency_types {
            if self.should_stop() {
                break;
            }
            let result = self.process_dependency_type(dependency_type).await;
            summary.add(result);
        }

        summary.halted = self.halted.take();
        summary.finish();
        summary
    }

    fn should_stop(&mut self) -> bool {
        if self.halted.is_none() && self.cancel.is_cancelled() {
            self.halted = Some("cancelled by user".to_string());
        }
        self.halted.is_some()
    }

    /// Steps for one manifest section; errors before selection abort only
    /// this section
    async fn process_dependency_type(&mut self, dependency_type: &str) -> DependencyTypeResult {
        self.progress
            .step(&format!("Checking outdated {}...", dependency_type));

        let records = match self.outdated_records(dependency_type) {
            Ok(records) => records,
            Err(e) => {
                self.progress
                    .error(&format!("Skipping {}: {}", dependency_type, e));
                return DependencyTypeResult::failed(dependency_type, e.to_string());
            }
        };

        let mut result = DependencyTypeResult::new(dependency_type);
        result.outdated = records.len();

        let groups = group(&records, self.options.strategy.delta_field());
        result.groups = groups.len();

        for candidate in select_candidates(&groups) {
            if self.should_stop() {
                break;
            }
            let attempt = self.attempt(candidate, dependency_type).await;
            result.attempts.push(attempt);
        }

        result
    }

    /// Outdated packages of one section that are declared there and pass
    /// the package filters
    fn outdated_records(&self, dependency_type: &str) -> Result<Vec<DependencyRecord>, AppError> {
        let report = self.package_manager.outdated(dependency_type)?;
        let records = normalize(&report)?;
        Ok(records
            .into_iter()
            .filter(|r| self.manifest.declares(dependency_type, &r.name))
            .filter(|r| self.options.should_process_package(&r.name))
            .collect())
    }

    /// Drive one candidate from `Selected` to a terminal state
    async fn attempt(&mut self, record: &DependencyRecord, dependency_type: &str) -> UpgradeAttempt {
        let field = self.options.strategy.delta_field();
        let target = record.target_version(field).to_string();
        let mut attempt = UpgradeAttempt::new(record.clone(), dependency_type, target);
        if let Some(spec) = self.manifest.spec_of(dependency_type, &record.name) {
            attempt = attempt.with_manifest_entry(spec);
        }

        if self.options.dry_run {
            self.progress.step(&format!(
                "Would update {} (current: {}, target: {})",
                attempt.package(),
                attempt.previous_version,
                attempt.target_version
            ));
            attempt.advance(UpgradeState::Planned);
            return attempt;
        }

        self.progress.step(&format!(
            "Updating {} (current: {}, target: {})...",
            attempt.package(),
            attempt.previous_version,
            attempt.target_version
        ));

        attempt.advance(UpgradeState::Applying);
        if let Err(e) = self
            .package_manager
            .upgrade(attempt.package(), &attempt.target_version)
        {
            self.progress
                .error(&format!("Failed to update {}: {}", attempt.package(), e));
            attempt.fail(UpgradeState::ApplyFailed, e.to_string());
            return attempt;
        }

        attempt.advance(UpgradeState::Verifying);
        self.progress.spinner(&format!(
            "Verifying {} with {}",
            attempt.package(),
            self.verifier.name()
        ));
        let verdict = self.verifier.verify(&attempt).await;
        self.progress.finish_and_clear();

        match verdict {
            Ok(Verdict::Passed) => {
                self.progress.success(&format!(
                    "Tests passed. {} updated to {}",
                    attempt.package(),
                    attempt.target_version
                ));
                self.commit(&mut attempt);
            }
            Ok(Verdict::Failed { reason }) => {
                self.progress.warn(&format!(
                    "Verification failed. Reverting {}...",
                    attempt.package()
                ));
                self.progress.detail(&reason);
                self.revert(&mut attempt, reason);
            }
            Err(e) => {
                self.progress.warn(&format!(
                    "Verification incomplete ({}). Reverting {}...",
                    e,
                    attempt.package()
                ));
                let cancelled = e.is_cancelled();
                self.revert(&mut attempt, e.to_string());
                if cancelled {
                    self.halted = Some(VerifyError::Cancelled.to_string());
                }
            }
        }

        attempt
    }

    /// Persist a verified upgrade. A failure here leaves an uncommitted
    /// upgrade in the working tree, so the run halts.
    fn commit(&mut self, attempt: &mut UpgradeAttempt) {
        let outcome = self.write_and_commit(attempt);
        match outcome {
            Ok(()) => attempt.advance(UpgradeState::Committed),
            Err(e) => {
                self.progress.error(&format!(
                    "Failed to commit {}: {}",
                    attempt.package(),
                    e
                ));
                attempt.fail(UpgradeState::CommitFailed, e.to_string());
                self.halted = Some(format!(
                    "commit of {} failed; working tree needs attention",
                    attempt.package()
                ));
            }
        }
    }

    fn write_and_commit(&mut self, attempt: &UpgradeAttempt) -> Result<(), AppError> {
        self.manifest.set_version(
            &attempt.dependency_type,
            attempt.package(),
            &attempt.target_version,
        )?;
        self.manifest.save()?;
        self.vcs.add_all()?;
        self.vcs.commit(&attempt.commit_message())?;
        self.vcs.push()?;
        Ok(())
    }

    /// Reinstall the previous version and put the manifest entry back
    /// exactly as it was declared, in memory and in the working tree
    fn revert(&mut self, attempt: &mut UpgradeAttempt, reason: String) {
        match self.restore(attempt) {
            Ok(()) => attempt.fail(UpgradeState::RevertedCleanly, reason),
            Err(e) => {
                self.progress.error(&format!(
                    "Failed to revert {}: {}",
                    attempt.package(),
                    e
                ));
                attempt.fail(
                    UpgradeState::RevertFailed,
                    format!("{}; revert failed: {}", reason, e),
                );
            }
        }
    }

    fn restore(&mut self, attempt: &UpgradeAttempt) -> Result<(), AppError> {
        self.package_manager.add(
            attempt.package(),
            &attempt.previous_version,
            &attempt.dependency_type,
        )?;
        match &attempt.previous_manifest_entry {
            Some(spec) => {
                self.manifest
                    .set_spec(&attempt.dependency_type, attempt.package(), spec)?
            }
            None => self.manifest.set_version(
                &attempt.dependency_type,
                attempt.package(),
                &attempt.previous_version,
            )?,
        }
        self.vcs.checkout_path(self.manifest.path())?;
        self.manifest.reload()?;
        Ok(())
    }
}

/// First member of every Patch group; one attempt per group per run
pub fn select_candidates(groups: &[CandidateGroup]) -> Vec<&DependencyRecord> {
    groups
        .iter()
        .filter(|g| g.severity() == Severity::Patch)
        .filter_map(CandidateGroup::representative)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutdatedReport;
    use crate::error::{SchemaError, ToolError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    const MANIFEST: &str = r#"{
  "name": "app",
  "dependencies": {
    "lodash": "^4.17.20",
    "react": "18.2.0",
    "react-dom": "18.2.0"
  },
  "devDependencies": {
    "jest": "~29.0.0"
  }
}
"#;

    fn report(rows: &[[&str; 4]]) -> OutdatedReport {
        OutdatedReport::new(
            ["Package", "Current", "Wanted", "Latest"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows.iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    /// Package manager that tracks installed versions in memory
    #[derive(Default)]
    struct FakePackageManager {
        reports: HashMap<String, Result<OutdatedReport, SchemaError>>,
        installed: Mutex<HashMap<String, String>>,
        calls: Mutex<Vec<String>>,
        fail_upgrade: Vec<String>,
        fail_add: bool,
    }

    impl FakePackageManager {
        fn with_report(mut self, dependency_type: &str, report: OutdatedReport) -> Self {
            self.reports.insert(dependency_type.to_string(), Ok(report));
            self
        }

        fn installed(&self, package: &str) -> Option<String> {
            self.installed.lock().unwrap().get(package).cloned()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PackageManager for FakePackageManager {
        fn name(&self) -> &str {
            "fake"
        }

        fn outdated(&self, dependency_type: &str) -> Result<OutdatedReport, AppError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("outdated {}", dependency_type));
            match self.reports.get(dependency_type) {
                Some(Ok(report)) => Ok(report.clone()),
                Some(Err(e)) => Err(e.clone().into()),
                None => Ok(OutdatedReport::default()),
            }
        }

        fn upgrade(&self, package: &str, version: &str) -> Result<(), ToolError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("upgrade {}@{}", package, version));
            if self.fail_upgrade.iter().any(|p| p == package) {
                return Err(ToolError::failed(
                    format!("fake upgrade {}@{}", package, version),
                    "no such version",
                ));
            }
            self.installed
                .lock()
                .unwrap()
                .insert(package.to_string(), version.to_string());
            Ok(())
        }

        fn add(&self, package: &str, version: &str, _dependency_type: &str) -> Result<(), ToolError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("add {}@{}", package, version));
            if self.fail_add {
                return Err(ToolError::failed("fake add", "lockfile busy"));
            }
            self.installed
                .lock()
                .unwrap()
                .insert(package.to_string(), version.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeVcs {
        calls: Mutex<Vec<String>>,
        fail_push: bool,
    }

    impl FakeVcs {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl VersionControl for FakeVcs {
        fn ensure_repository(&self) -> Result<(), ToolError> {
            Ok(())
        }
        fn add_all(&self) -> Result<(), ToolError> {
            self.record("add --all".to_string());
            Ok(())
        }
        fn commit(&self, message: &str) -> Result<(), ToolError> {
            self.record(format!("commit {}", message));
            Ok(())
        }
        fn push(&self) -> Result<(), ToolError> {
            self.record("push".to_string());
            if self.fail_push {
                return Err(ToolError::failed("git push", "rejected"));
            }
            Ok(())
        }
        fn checkout_path(&self, path: &Path) -> Result<(), ToolError> {
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            self.record(format!("checkout {}", name));
            Ok(())
        }
        fn current_branch(&self) -> Result<String, ToolError> {
            Ok("main".to_string())
        }
    }

    /// Verifier that fails for listed packages
    #[derive(Default)]
    struct FakeVerifier {
        failing: Vec<String>,
        error: Option<fn() -> VerifyError>,
        verified: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Verifier for FakeVerifier {
        fn name(&self) -> &str {
            "fake tests"
        }

        async fn verify(&self, attempt: &UpgradeAttempt) -> Result<Verdict, VerifyError> {
            self.verified
                .lock()
                .unwrap()
                .push(attempt.package().to_string());
            if let Some(error) = self.error {
                return Err(error());
            }
            if self.failing.iter().any(|p| p == attempt.package()) {
                return Ok(Verdict::failed("2 tests failed"));
            }
            Ok(Verdict::Passed)
        }
    }

    fn manifest() -> (tempfile::TempDir, Manifest) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, MANIFEST).unwrap();
        let manifest = Manifest::load(&path).unwrap();
        (dir, manifest)
    }

    fn lodash_pm() -> FakePackageManager {
        FakePackageManager::default().with_report(
            "dependencies",
            report(&[["lodash", "4.17.20", "4.17.21", "5.0.0"]]),
        )
    }

    #[tokio::test]
    async fn test_conservative_commits_lodash_patch() {
        let (_dir, manifest) = manifest();
        let pm = lodash_pm();
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier::default();

        let mut orchestrator =
            Orchestrator::new(&pm, &vcs, &verifier, manifest, RunOptions::default());
        let summary = orchestrator.run().await;

        assert_eq!(summary.committed(), 1);
        let attempt = summary.attempts().next().unwrap();
        assert_eq!(attempt.target_version, "4.17.21");
        assert_eq!(attempt.state, UpgradeState::Committed);
        assert_eq!(pm.installed("lodash").as_deref(), Some("4.17.21"));
        assert_eq!(
            vcs.calls(),
            ["add --all", "commit Update lodash to 4.17.21", "push"]
        );

        let on_disk = std::fs::read_to_string(orchestrator.manifest().path()).unwrap();
        assert!(on_disk.contains(r#""lodash": "^4.17.21""#));
        assert!(summary.halted.is_none());
    }

    #[tokio::test]
    async fn test_aggressive_skips_major_lodash() {
        let (_dir, manifest) = manifest();
        let pm = lodash_pm();
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier::default();
        let options = RunOptions {
            strategy: Strategy::Aggressive,
            ..RunOptions::default()
        };

        let mut orchestrator = Orchestrator::new(&pm, &vcs, &verifier, manifest, options);
        let summary = orchestrator.run().await;

        assert_eq!(summary.attempts().count(), 0);
        assert_eq!(summary.dependency_types[0].outdated, 1);
        assert_eq!(summary.dependency_types[0].groups, 1);
        assert!(pm.installed("lodash").is_none());
        assert!(vcs.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_verification_reverts() {
        let (_dir, manifest) = manifest();
        let pm = lodash_pm();
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier {
            failing: vec!["lodash".to_string()],
            ..Default::default()
        };

        let mut orchestrator =
            Orchestrator::new(&pm, &vcs, &verifier, manifest, RunOptions::default());
        let summary = orchestrator.run().await;

        let attempt = summary.attempts().next().unwrap();
        assert_eq!(attempt.state, UpgradeState::RevertedCleanly);
        assert_eq!(attempt.note.as_deref(), Some("2 tests failed"));
        assert_eq!(pm.installed("lodash").as_deref(), Some("4.17.20"));
        assert_eq!(
            orchestrator.manifest().version_of("dependencies", "lodash"),
            Some("4.17.20")
        );
        assert_eq!(vcs.calls(), ["checkout package.json"]);
        assert_eq!(
            pm.calls(),
            [
                "outdated dependencies",
                "upgrade lodash@4.17.21",
                "add lodash@4.17.20",
                "outdated devDependencies"
            ]
        );
        assert!(!summary.has_errors());
    }

    #[tokio::test]
    async fn test_revert_restores_declared_range_before_next_commit() {
        let content = r#"{
  "dependencies": {
    "lodash": "^4.17.0",
    "react": "18.2.0"
  }
}
"#;
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, content).unwrap();
        let manifest = Manifest::load(&path).unwrap();

        let pm = FakePackageManager::default().with_report(
            "dependencies",
            report(&[
                ["lodash", "4.17.20", "4.17.21", "4.17.21"],
                ["react", "18.2.0", "18.2.1", "18.2.1"],
            ]),
        );
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier {
            failing: vec!["lodash".to_string()],
            ..Default::default()
        };

        let mut orchestrator =
            Orchestrator::new(&pm, &vcs, &verifier, manifest, RunOptions::default());
        let summary = orchestrator.run().await;

        let states: Vec<_> = summary
            .attempts()
            .map(|a| (a.package().to_string(), a.state))
            .collect();
        assert_eq!(
            states,
            [
                ("lodash".to_string(), UpgradeState::RevertedCleanly),
                ("react".to_string(), UpgradeState::Committed),
            ]
        );

        // the installed version goes back to 4.17.20, the declared range to ^4.17.0
        assert_eq!(pm.installed("lodash").as_deref(), Some("4.17.20"));
        assert_eq!(
            orchestrator.manifest().spec_of("dependencies", "lodash"),
            Some("^4.17.0")
        );
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            content.replace(r#""react": "18.2.0""#, r#""react": "18.2.1""#)
        );
    }

    #[tokio::test]
    async fn test_verification_error_takes_revert_path() {
        let (_dir, manifest) = manifest();
        let pm = lodash_pm();
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier {
            error: Some(|| VerifyError::Timeout {
                pipeline: "p-1".to_string(),
                polls: 3,
            }),
            ..Default::default()
        };

        let mut orchestrator =
            Orchestrator::new(&pm, &vcs, &verifier, manifest, RunOptions::default());
        let summary = orchestrator.run().await;

        let attempt = summary.attempts().next().unwrap();
        assert_eq!(attempt.state, UpgradeState::RevertedCleanly);
        assert!(attempt.note.as_deref().unwrap().contains("p-1"));
        assert!(summary.halted.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_verification_reverts_and_halts() {
        let (_dir, manifest) = manifest();
        let pm = lodash_pm().with_report(
            "devDependencies",
            report(&[["jest", "29.0.0", "29.0.1", "29.0.1"]]),
        );
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier {
            error: Some(|| VerifyError::Cancelled),
            ..Default::default()
        };

        let mut orchestrator =
            Orchestrator::new(&pm, &vcs, &verifier, manifest, RunOptions::default());
        let summary = orchestrator.run().await;

        assert_eq!(summary.attempts().count(), 1);
        assert_eq!(summary.reverted(), 1);
        assert_eq!(summary.halted.as_deref(), Some("verification cancelled"));
        assert!(!pm.calls().contains(&"outdated devDependencies".to_string()));
    }

    #[tokio::test]
    async fn test_revert_failure() {
        let (_dir, manifest) = manifest();
        let pm = FakePackageManager {
            fail_add: true,
            ..lodash_pm()
        };
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier {
            failing: vec!["lodash".to_string()],
            ..Default::default()
        };

        let mut orchestrator =
            Orchestrator::new(&pm, &vcs, &verifier, manifest, RunOptions::default());
        let summary = orchestrator.run().await;

        let attempt = summary.attempts().next().unwrap();
        assert_eq!(attempt.state, UpgradeState::RevertFailed);
        assert!(attempt.note.as_deref().unwrap().contains("lockfile busy"));
        assert!(vcs.calls().is_empty());
        assert!(summary.has_errors());
    }

    #[tokio::test]
    async fn test_apply_failure_continues_with_next_group() {
        let (_dir, manifest) = manifest();
        let pm = FakePackageManager {
            fail_upgrade: vec!["lodash".to_string()],
            ..FakePackageManager::default().with_report(
                "dependencies",
                report(&[
                    ["lodash", "4.17.20", "4.17.21", "5.0.0"],
                    ["react", "18.2.0", "18.2.1", "18.2.1"],
                ]),
            )
        };
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier::default();

        let mut orchestrator =
            Orchestrator::new(&pm, &vcs, &verifier, manifest, RunOptions::default());
        let summary = orchestrator.run().await;

        let states: Vec<_> = summary.attempts().map(|a| a.state).collect();
        assert_eq!(states, [UpgradeState::ApplyFailed, UpgradeState::Committed]);
        assert_eq!(*verifier.verified.lock().unwrap(), ["react"]);
        assert!(vcs.calls().contains(&"commit Update react to 18.2.1".to_string()));
    }

    #[tokio::test]
    async fn test_commit_failure_halts_run() {
        let (_dir, manifest) = manifest();
        let pm = FakePackageManager::default()
            .with_report(
                "dependencies",
                report(&[
                    ["lodash", "4.17.20", "4.17.21", "5.0.0"],
                    ["react", "18.2.0", "18.2.1", "18.2.1"],
                ]),
            )
            .with_report(
                "devDependencies",
                report(&[["jest", "29.0.0", "29.0.1", "29.0.1"]]),
            );
        let vcs = FakeVcs {
            fail_push: true,
            ..Default::default()
        };
        let verifier = FakeVerifier::default();

        let mut orchestrator =
            Orchestrator::new(&pm, &vcs, &verifier, manifest, RunOptions::default());
        let summary = orchestrator.run().await;

        assert_eq!(summary.attempts().count(), 1);
        assert_eq!(summary.count(UpgradeState::CommitFailed), 1);
        assert!(summary.halted.as_deref().unwrap().contains("lodash"));
        assert_eq!(summary.dependency_types.len(), 1);
        assert!(summary.has_errors());
    }

    #[tokio::test]
    async fn test_one_attempt_per_group() {
        let (_dir, manifest) = manifest();
        let pm = FakePackageManager::default().with_report(
            "dependencies",
            report(&[
                ["react", "18.2.0", "18.2.1", "18.2.1"],
                ["react-dom", "18.2.0", "18.2.1", "18.2.1"],
            ]),
        );
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier::default();

        let mut orchestrator =
            Orchestrator::new(&pm, &vcs, &verifier, manifest, RunOptions::default());
        let summary = orchestrator.run().await;

        assert_eq!(summary.dependency_types[0].groups, 1);
        let names: Vec<_> = summary.attempts().map(|a| a.package().to_string()).collect();
        assert_eq!(names, ["react"]);
    }

    #[tokio::test]
    async fn test_schema_error_skips_dependency_type() {
        let (_dir, manifest) = manifest();
        let mut pm = FakePackageManager::default().with_report(
            "devDependencies",
            report(&[["jest", "29.0.0", "29.0.1", "29.0.1"]]),
        );
        pm.reports.insert(
            "dependencies".to_string(),
            Err(SchemaError::missing_column("Wanted")),
        );
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier::default();

        let mut orchestrator =
            Orchestrator::new(&pm, &vcs, &verifier, manifest, RunOptions::default());
        let summary = orchestrator.run().await;

        assert!(summary.dependency_types[0]
            .error
            .as_deref()
            .unwrap()
            .contains("Wanted"));
        assert_eq!(summary.dependency_types[1].attempts.len(), 1);
        assert_eq!(summary.committed(), 1);
        assert_eq!(
            orchestrator.manifest().spec_of("devDependencies", "jest"),
            Some("~29.0.1")
        );
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_changes() {
        let (_dir, manifest) = manifest();
        let pm = lodash_pm();
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier::default();
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };

        let mut orchestrator = Orchestrator::new(&pm, &vcs, &verifier, manifest, options);
        let summary = orchestrator.run().await;

        assert_eq!(summary.count(UpgradeState::Planned), 1);
        assert!(pm.installed("lodash").is_none());
        assert!(vcs.calls().is_empty());
        assert!(verifier.verified.lock().unwrap().is_empty());
        let on_disk = std::fs::read_to_string(orchestrator.manifest().path()).unwrap();
        assert_eq!(on_disk, MANIFEST);
    }

    #[tokio::test]
    async fn test_filters_and_undeclared_packages() {
        let (_dir, manifest) = manifest();
        let pm = FakePackageManager::default().with_report(
            "dependencies",
            report(&[
                ["lodash", "4.17.20", "4.17.21", "5.0.0"],
                ["react", "18.2.0", "18.2.1", "18.2.1"],
                ["left-pad", "1.0.0", "1.0.1", "1.0.1"],
            ]),
        );
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier::default();
        let options = RunOptions {
            exclude: vec!["lodash".to_string()],
            dry_run: true,
            ..RunOptions::default()
        };

        let mut orchestrator = Orchestrator::new(&pm, &vcs, &verifier, manifest, options);
        let summary = orchestrator.run().await;

        assert_eq!(summary.dependency_types[0].outdated, 1);
        let names: Vec<_> = summary.attempts().map(|a| a.package().to_string()).collect();
        assert_eq!(names, ["react"]);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let (_dir, manifest) = manifest();
        let pm = lodash_pm();
        let vcs = FakeVcs::default();
        let verifier = FakeVerifier::default();
        let (trigger, signal) = crate::verify::cancellation();
        trigger.cancel();

        let mut orchestrator =
            Orchestrator::new(&pm, &vcs, &verifier, manifest, RunOptions::default())
                .with_cancel(signal);
        let summary = orchestrator.run().await;

        assert!(summary.dependency_types.is_empty());
        assert_eq!(summary.halted.as_deref(), Some("cancelled by user"));
        assert!(pm.calls().is_empty());
    }

    #[test]
    fn test_select_candidates() {
        let records: Vec<DependencyRecord> = normalize(&report(&[
            ["babel-core", "7.0.0", "7.0.1", "7.0.1"],
            ["babel-cli", "7.0.0", "7.0.2", "7.0.2"],
            ["eslint", "8.0.0", "8.1.0", "9.0.0"],
            ["typescript", "5.0.0", "5.0.0", "5.1.0"],
        ]))
        .unwrap();
        let groups = group(&records, crate::domain::DeltaField::Wanted);
        let selected: Vec<_> = select_candidates(&groups)
            .into_iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(selected, ["babel-core"]);
    }

    #[test]
    fn test_should_process_package() {
        let options = RunOptions::default();
        assert!(options.should_process_package("lodash"));

        let options = RunOptions {
            only: vec!["lodash".to_string()],
            exclude: vec!["lodash".to_string()],
            ..RunOptions::default()
        };
        assert!(options.should_process_package("lodash"));
        assert!(!options.should_process_package("react"));
    }
}
