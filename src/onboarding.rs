use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use inquire::{Confirm, Select, Text};

use crate::config::{expand_tilde, is_valid_git_url, IntegrationStrategy, SyncConfig, SyncMode};

/// How conflicts should be handled, as offered by the wizard
#[derive(Debug, Clone, Copy)]
enum ConflictChoice {
    Editor,
    Abort,
}

impl std::fmt::Display for ConflictChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictChoice::Editor => write!(f, "Open conflicted files in an editor"),
            ConflictChoice::Abort => write!(f, "Abort the merge and retry on the next sync"),
        }
    }
}

/// Run the interactive setup wizard
pub fn run_onboarding() -> Result<SyncConfig> {
    println!("\n{}", "⚙️  Let's configure git-autosync!".cyan().bold());
    println!();

    let url = Text::new("Remote repository URL:")
        .with_placeholder("git@github.com:user/notes.git or https://github.com/user/notes.git")
        .with_help_message("The repository this directory is kept in sync with")
        .prompt()
        .context("Failed to get remote URL")?;
    let url = url.trim().to_string();

    let path_str = Text::new("Local directory:")
        .with_placeholder("~/notes")
        .with_help_message("Cloned into when empty, initialized as a new repository otherwise")
        .prompt()
        .context("Failed to get local path")?;
    let repo_path = expand_tilde(path_str.trim())?;

    let mut config = SyncConfig::new(repo_path, url);

    config.branch = Text::new("Branch to sync:")
        .with_default("main")
        .prompt()
        .context("Failed to get branch")?
        .trim()
        .to_string();

    let interval = Text::new("Sync interval (minutes):")
        .with_default("10")
        .prompt()
        .context("Failed to get sync interval")?;
    config.sync_interval_minutes = interval
        .trim()
        .parse::<u64>()
        .context("Invalid number of minutes")?;

    println!();

    let conflicts = Select::new(
        "When local and remote edits conflict:",
        vec![ConflictChoice::Editor, ConflictChoice::Abort],
    )
    .prompt()
    .context("Failed to get conflict preference")?;
    config.auto_resolve_conflicts = matches!(conflicts, ConflictChoice::Editor);

    let rebase = Confirm::new("Rebase local commits onto the remote before merging?")
        .with_default(false)
        .with_help_message("Keeps history linear; falls back to a merge when the rebase fails")
        .prompt()
        .context("Failed to get strategy preference")?;
    if rebase {
        config.strategy = IntegrationStrategy::RebaseThenMerge;
    }

    let force = Confirm::new("Force-push local history, overwriting the remote?")
        .with_default(false)
        .with_help_message("Remote-only commits are discarded on every sync")
        .prompt()
        .context("Failed to get mode preference")?;
    if force {
        config.mode = SyncMode::Force;
    }

    config.validate()?;

    println!();
    println!("{}", "✓ Configuration complete!".green().bold());

    Ok(config)
}

/// Build a configuration from command-line flags, without prompting.
pub fn config_from_flags(
    repo: &str,
    remote: &str,
    branch: Option<String>,
    interval: Option<u64>,
) -> Result<SyncConfig> {
    if !is_valid_git_url(remote) && !std::path::Path::new(remote).exists() {
        return Err(anyhow!(
            "Invalid git URL. Must start with 'https://', 'http://', 'git@', 'ssh://' or 'file://'"
        ));
    }

    let mut config = SyncConfig::new(expand_tilde(repo)?, remote);
    if let Some(branch) = branch {
        config.branch = branch;
    }
    if let Some(minutes) = interval {
        config.sync_interval_minutes = minutes;
    }
    config.validate()?;
    Ok(config)
}
