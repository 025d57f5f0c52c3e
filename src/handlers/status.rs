//! Status handler

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::config::SyncConfig;
use crate::report::SyncReport;
use crate::scm;
use crate::sync::RepositoryState;

/// Handle `status`: repository state, pending changes and the last sync.
pub fn handle_status(config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let config = SyncConfig::load(config_path).context("Failed to load configuration")?;

    println!("{}", "Sync Status".cyan().bold());
    println!("{}", "=".repeat(40).cyan());
    println!("  {} {}", "Repo:".bold(), config.repo_path.display());
    println!("  {} {}", "Remote:".bold(), config.remote_url);
    println!("  {} {} ({} mode)", "Branch:".bold(), config.branch, config.mode);

    if scm::is_repo(&config.repo_path) {
        let repo = scm::open(&config.repo_path)?;

        let current = repo.current_branch()?;
        let current = if current.is_empty() {
            "(detached HEAD)".yellow().to_string()
        } else {
            current
        };
        println!("  {} {}", "Checked out:".bold(), current);

        let state = RepositoryState::probe(repo.as_ref())?;
        let state_text = state.to_string();
        let state_text = if state.is_in_progress() {
            state_text.yellow().bold()
        } else {
            state_text.green()
        };
        println!("  {} {}", "State:".bold(), state_text);

        let conflicts = repo.conflicted_files()?;
        for entry in &conflicts {
            println!("    {} {} ({})", "CONFLICT".yellow(), entry.path, entry.kind);
        }

        let pending = if repo.has_changes()? {
            "yes".yellow()
        } else {
            "no".normal()
        };
        println!("  {} {}", "Uncommitted changes:".bold(), pending);
    } else {
        println!(
            "  {}",
            "Repository not created yet; it will be set up on the first sync.".yellow()
        );
    }

    match SyncReport::load_last()? {
        Some(report) => report.print_summary(verbose),
        None => println!("\n{}", "No sync has run yet.".dimmed()),
    }

    Ok(())
}
