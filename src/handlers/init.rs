//! Initialization handler
//!
//! Writes the configuration (from flags or the interactive wizard) and
//! acquires the working copy right away so setup problems surface early.

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::config::{ConfigManager, SyncConfig};
use crate::interactive_conflict::is_interactive;
use crate::logger::FileSink;
use crate::onboarding;
use crate::sync::acquire_repository;

/// Check if a configuration file exists
pub fn is_initialized(config_path: Option<&Path>) -> Result<bool> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => ConfigManager::config_file_path()?,
    };
    Ok(path.exists())
}

/// Handle `init`.
///
/// With both `repo` and `remote` the configuration is built from flags;
/// otherwise the wizard runs, which needs a terminal.
pub fn handle_init(
    config_path: Option<&Path>,
    repo: Option<String>,
    remote: Option<String>,
    branch: Option<String>,
    interval: Option<u64>,
) -> Result<()> {
    if is_initialized(config_path)? {
        log::warn!("Overwriting existing configuration");
    }

    let config = match (repo, remote) {
        (Some(repo), Some(remote)) => onboarding::config_from_flags(&repo, &remote, branch, interval)?,
        _ => {
            if !is_interactive() {
                return Err(anyhow!(
                    "Not an interactive terminal. Pass --repo and --remote to initialize without prompts."
                ));
            }
            onboarding::run_onboarding().context("Setup cancelled or failed")?
        }
    };

    let saved_to = config.save(config_path)?;
    println!("{} {}", "✓ Configuration saved to".green(), saved_to.display());

    prepare_repository(&config)?;

    println!("{}", "✓ Ready to sync!".green().bold());
    println!("  {} {}", "Repo:".cyan(), config.repo_path.display());
    println!("  {} {}", "Remote:".cyan(), config.remote_url);
    println!("  {} {}", "Branch:".cyan(), config.branch);
    println!(
        "  {} every {} minute(s)",
        "Interval:".cyan(),
        config.sync_interval_minutes
    );
    println!();

    Ok(())
}

fn prepare_repository(config: &SyncConfig) -> Result<()> {
    println!("{}", "Preparing repository...".cyan());
    let mut sink = FileSink::default_location()?;
    acquire_repository(config, &mut sink)?;
    Ok(())
}
