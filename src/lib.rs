//! `gh_issues_local` - Local GitHub Issues REST API
//!
//! This crate provides the `gh-issues-local` server: GitHub-compatible issue
//! endpoints over the [`issues_core`] tracker, persisted to a JSONL file.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Layered configuration (YAML, environment, flags)
//! - [`format`] - GitHub-shaped JSON rendering
//! - [`logging`] - `tracing` subscriber setup
//! - [`web`] - axum router, handlers, auth gate

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod format;
pub mod logging;
pub mod web;

pub use config::Config;

/// Run the CLI application.
///
/// This is the main entry point called from `main()`.
///
/// # Errors
///
/// Returns an error if configuration, startup or the command fails.
pub fn run() -> anyhow::Result<()> {
    cli::run()
}
