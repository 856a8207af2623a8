//! safeup - patch-level dependency upgrader CLI tool
//!
//! Upgrades outdated Node.js dependencies one group representative at a
//! time, keeping each upgrade only if the tests (or CI) pass.

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use safeup::cli::CliArgs;
use safeup::config::{Config, VerifyMode};
use safeup::manifest::Manifest;
use safeup::orchestrator::Orchestrator;
use safeup::output::{create_formatter, OutputConfig};
use safeup::package_manager::SystemPackageManager;
use safeup::progress::Progress;
use safeup::vcs::{GitCli, VersionControl};
use safeup::verify::{
    cancellation, CancelSignal, CiVerifier, CircleCiClient, LocalTestVerifier, Verifier,
};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let mut config = Config::load(&args.config_path())?;
    args.apply_to(&mut config);
    config.validate()?;

    if args.verbose {
        eprintln!("safeup v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Target: {}", args.path.display());
        eprintln!("Strategy: {}", config.strategy);
        if args.dry_run {
            eprintln!("Mode: dry-run");
        }
    }

    let manifest = Manifest::load(config.manifest_path(&args.path))?;

    let git = Arc::new(GitCli::new(&args.path).with_verbose(args.verbose));
    git.ensure_repository()
        .context("git is unavailable or the project is not inside a git repository")?;

    let package_manager = match config.package_manager()? {
        Some(kind) => SystemPackageManager::new(kind, &args.path),
        None => SystemPackageManager::detect(&args.path),
    }
    .with_verbose(args.verbose);

    if args.verbose {
        eprintln!("Package manager: {}", package_manager.kind());
        match config.verify.mode {
            VerifyMode::Local => {
                eprintln!("Verify: {}", config.verify.test_command.join(" "))
            }
            VerifyMode::Ci => eprintln!(
                "Verify: ci (gives up after {}s)",
                config.ci.poll_policy().deadline().as_secs()
            ),
        }
    }

    let (trigger, cancel) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let verifier = build_verifier(&config, &args.path, git.clone(), cancel.clone())?;
    let progress = Progress::new(!args.quiet).with_verbose(args.verbose);

    let mut orchestrator = Orchestrator::new(
        &package_manager,
        git.as_ref(),
        verifier.as_ref(),
        manifest,
        args.run_options(&config),
    )
    .with_cancel(cancel)
    .with_progress(progress);
    let summary = orchestrator.run().await;

    let formatter = create_formatter(OutputConfig::from_cli(args.json, args.verbose, args.quiet));
    let mut stdout = io::stdout().lock();
    formatter.format(&summary, &mut stdout)?;
    stdout.flush()?;

    Ok(ExitCode::SUCCESS)
}

/// Build the verifier selected by the configuration
fn build_verifier(
    config: &Config,
    project_dir: &Path,
    vcs: Arc<dyn VersionControl>,
    cancel: CancelSignal,
) -> anyhow::Result<Box<dyn Verifier>> {
    match config.verify.mode {
        VerifyMode::Local => Ok(Box::new(
            LocalTestVerifier::new(config.verify.test_command.clone(), project_dir)
                .with_cancel(cancel),
        )),
        VerifyMode::Ci => {
            let slug = config.ci.project_slug.clone().unwrap_or_default();
            let client = CircleCiClient::new(&config.ci.api_base, slug, config.ci.token()?)?;
            Ok(Box::new(
                CiVerifier::new(client, vcs, config.ci.poll_policy()).with_cancel(cancel),
            ))
        }
    }
}
