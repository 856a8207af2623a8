//! safeup - patch-level dependency upgrader library
//!
//! This library provides the core functionality for upgrading a Node.js
//! project's dependencies one candidate at a time:
//! - Severity classification and grouping of outdated packages
//! - Apply → verify → commit-or-revert state machine
//! - Local test and CI pipeline verification
//! - Package manager (yarn, npm, pnpm) and git integration

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod package_manager;
pub mod progress;
pub mod vcs;
pub mod verify;
