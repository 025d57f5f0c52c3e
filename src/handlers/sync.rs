//! Sync command handlers
//!
//! `sync` runs one reconciliation; `run` repeats it on the configured
//! interval until the process is stopped.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::thread;

use crate::config::SyncConfig;
use crate::interactive_conflict::ConflictResolver;
use crate::logger::FileSink;
use crate::report::SyncReport;
use crate::sync::{RepositoryReconciler, SyncOutcome};

fn open_reconciler(config_path: Option<&Path>) -> Result<RepositoryReconciler> {
    let config = SyncConfig::load(config_path).context("Failed to load configuration")?;
    let resolver = ConflictResolver::terminal(config.editor.clone());
    let sink = FileSink::default_location()?;

    let reconciler = RepositoryReconciler::open(config, resolver, Box::new(sink))?;
    Ok(reconciler)
}

fn record(report: &SyncReport, verbose: bool) {
    if let Err(e) = report.save_last() {
        log::warn!("Failed to save sync report: {e:#}");
    }
    report.print_summary(verbose);
}

/// Handle `sync`: run once and return the outcome.
pub fn handle_sync(config_path: Option<&Path>, verbose: bool) -> Result<SyncOutcome> {
    let mut reconciler = open_reconciler(config_path)?;

    println!(
        "{}",
        format!(
            "Syncing {} with origin/{}...",
            reconciler.config().repo_path.display(),
            reconciler.config().branch
        )
        .cyan()
    );

    let report = reconciler.sync_once();
    record(&report, verbose);
    Ok(report.outcome)
}

/// Handle `run`: sync every `sync_interval_minutes`.
///
/// A failed sync is reported and retried on the next tick. Only a setup
/// failure at startup ends the loop.
pub fn handle_run(config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let mut reconciler = open_reconciler(config_path)?;
    let interval = reconciler.config().sync_interval();

    println!(
        "{} every {} minute(s). Press Ctrl+C to stop.",
        "Syncing".cyan().bold(),
        reconciler.config().sync_interval_minutes
    );

    loop {
        let report = reconciler.sync_once();
        record(&report, verbose);

        if report.outcome.is_failure() {
            log::warn!("Sync ended with '{}', retrying in {:?}", report.outcome, interval);
        }

        thread::sleep(interval);
    }
}
