//! Configuration display handler

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::config::{ConfigManager, SyncConfig};

/// Handle `config --show`
pub fn handle_config_show(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => ConfigManager::config_file_path()?,
    };
    let config = SyncConfig::load(Some(&path)).context("Failed to load configuration")?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "=".repeat(40).cyan());
    println!("  {} {}", "File:".dimmed(), path.display());
    println!();
    display_config_summary(&config);

    Ok(())
}

/// Handle `config` without flags: say where the file lives.
pub fn handle_config_path(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => ConfigManager::config_file_path()?,
    };
    println!("{} {}", "Configuration file:".bold(), path.display());
    if path.exists() {
        println!("Edit it directly, or use {} to print it.", "--show".cyan());
    } else {
        println!("Not created yet. Run {} first.", "git-autosync init".cyan());
    }
    Ok(())
}

fn display_config_summary(config: &SyncConfig) {
    println!("  {} {}", "Repo path:".bold(), config.repo_path.display());
    println!("  {} {}", "Remote URL:".bold(), config.remote_url);
    println!("  {} {}", "Branch:".bold(), config.branch);
    println!(
        "  {} {} minute(s)",
        "Sync interval:".bold(),
        config.sync_interval_minutes
    );
    println!("  {} {}", "Mode:".bold(), config.mode);
    println!("  {} {}", "Strategy:".bold(), config.strategy);
    println!(
        "  {} {}",
        "Auto-resolve conflicts:".bold(),
        if config.auto_resolve_conflicts {
            "yes".green()
        } else {
            "no".yellow()
        }
    );
    println!(
        "  {} {}",
        "Editor:".bold(),
        config.editor.as_deref().unwrap_or("$VISUAL / $EDITOR")
    );
    println!("  {} {:?}", "Commit prefix:".bold(), config.commit_prefix);
    println!("  {} {}", "Commit template:".bold(), config.commit_message_template);
    println!("  {} {}", "Merge template:".bold(), config.merge_message_template);
    println!(
        "  {} {}",
        "Include file count:".bold(),
        config.include_file_count
    );
    println!(
        "  {} {} <{}>",
        "Author:".bold(),
        config.author_name,
        config.author_email
    );
}
