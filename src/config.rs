use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "git-autosync";

/// Token replaced by the commit time in message templates.
pub const TIMESTAMP_TOKEN: &str = "{timestamp}";

/// Longest allowed sync interval: one week.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Cross-platform configuration directory manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the main configuration directory path following platform conventions:
    /// - Linux: $XDG_CONFIG_HOME/git-autosync or ~/.config/git-autosync
    /// - macOS: ~/Library/Application Support/git-autosync
    /// - Windows: %APPDATA%\git-autosync
    pub fn config_dir() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
                Ok(PathBuf::from(xdg_config).join(APP_DIR))
            } else {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                Ok(home.join(".config").join(APP_DIR))
            }
        }

        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join("Library").join("Application Support").join(APP_DIR))
        }

        #[cfg(target_os = "windows")]
        {
            Ok(dirs::config_dir()
                .context("Failed to get Windows config directory")?
                .join(APP_DIR))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join(".git-autosync"))
        }
    }

    /// Get the sync configuration file path (config.toml)
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the path of the last sync report
    pub fn last_report_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("last-sync.json"))
    }

    /// Get the log file path
    pub fn log_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("git-autosync.log"))
    }

    /// Ensure the configuration directory exists
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir).with_context(|| {
            format!("Failed to create config directory: {}", config_dir.display())
        })?;
        Ok(config_dir)
    }
}

/// How local history is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Commit, integrate remote history, resolve conflicts, then push.
    #[default]
    Safe,
    /// Commit (even when empty) and force-push, discarding remote-only commits.
    Force,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Safe => write!(f, "safe"),
            SyncMode::Force => write!(f, "force"),
        }
    }
}

/// How remote history is integrated in safe mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationStrategy {
    #[default]
    Merge,
    /// Rebase onto the remote branch, falling back to merge when the rebase
    /// fails for a reason other than conflicts.
    RebaseThenMerge,
}

impl std::fmt::Display for IntegrationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrationStrategy::Merge => write!(f, "merge"),
            IntegrationStrategy::RebaseThenMerge => write!(f, "rebase-then-merge"),
        }
    }
}

/// Sync configuration, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Local working copy
    pub repo_path: PathBuf,

    /// URL of the "origin" remote
    pub remote_url: String,

    /// Branch kept in sync on both sides
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Minutes between scheduled syncs
    #[serde(default = "default_interval")]
    pub sync_interval_minutes: u64,

    /// Open an editor on conflicted files instead of aborting the merge
    #[serde(default = "default_true")]
    pub auto_resolve_conflicts: bool,

    #[serde(default)]
    pub mode: SyncMode,

    #[serde(default)]
    pub strategy: IntegrationStrategy,

    #[serde(default = "default_commit_template")]
    pub commit_message_template: String,

    #[serde(default = "default_merge_template")]
    pub merge_message_template: String,

    /// Prepended to every generated message; empty disables it
    #[serde(default = "default_prefix")]
    pub commit_prefix: String,

    /// Append "(N files changed)" to commit messages
    #[serde(default = "default_true")]
    pub include_file_count: bool,

    /// Editor command for conflict resolution (falls back to $VISUAL / $EDITOR)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,

    /// Committer identity written to the repository when none is configured
    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default = "default_author_email")]
    pub author_email: String,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_interval() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_commit_template() -> String {
    format!("Committed at: {TIMESTAMP_TOKEN}")
}

fn default_merge_template() -> String {
    format!("Merged at: {TIMESTAMP_TOKEN}")
}

fn default_prefix() -> String {
    "Auto-sync".to_string()
}

fn default_author_name() -> String {
    "git-autosync".to_string()
}

fn default_author_email() -> String {
    "git-autosync@localhost".to_string()
}

impl SyncConfig {
    /// A configuration with every optional field at its default.
    pub fn new(repo_path: impl Into<PathBuf>, remote_url: impl Into<String>) -> Self {
        SyncConfig {
            repo_path: repo_path.into(),
            remote_url: remote_url.into(),
            branch: default_branch(),
            sync_interval_minutes: default_interval(),
            auto_resolve_conflicts: true,
            mode: SyncMode::default(),
            strategy: IntegrationStrategy::default(),
            commit_message_template: default_commit_template(),
            merge_message_template: default_merge_template(),
            commit_prefix: default_prefix(),
            include_file_count: true,
            editor: None,
            author_name: default_author_name(),
            author_email: default_author_email(),
        }
    }

    /// Load and validate the configuration at `path`, or at the default
    /// location when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => ConfigManager::config_file_path()?,
        };

        if !config_path.exists() {
            return Err(anyhow!(
                "No configuration found at {}. Run 'git-autosync init' first.",
                config_path.display()
            ));
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: SyncConfig =
            toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to `path`, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => ConfigManager::config_file_path()?,
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(config_path)
    }

    /// Reject settings the reconciler cannot work with.
    /// Time between scheduled syncs, capped at [`MAX_INTERVAL_MINUTES`].
    pub fn sync_interval(&self) -> Duration {
        let minutes = self.sync_interval_minutes.min(MAX_INTERVAL_MINUTES);
        Duration::from_secs(minutes * 60)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_git_url(&self.remote_url) && !Path::new(&self.remote_url).exists() {
            return Err(anyhow!(
                "Invalid remote URL: {}\n\
                URL must start with https://, http://, git@, ssh:// or file://, \
                or name an existing local repository",
                self.remote_url
            ));
        }
        if self.branch.trim().is_empty() {
            return Err(anyhow!("Branch name must not be empty"));
        }
        if !(1..=MAX_INTERVAL_MINUTES).contains(&self.sync_interval_minutes) {
            return Err(anyhow!(
                "sync_interval_minutes must be between 1 and {MAX_INTERVAL_MINUTES}"
            ));
        }
        for (name, template) in [
            ("commit_message_template", &self.commit_message_template),
            ("merge_message_template", &self.merge_message_template),
        ] {
            if !template.contains(TIMESTAMP_TOKEN) {
                return Err(anyhow!("{name} must contain {TIMESTAMP_TOKEN}"));
            }
        }
        Ok(())
    }
}

/// Validate git URL format
pub fn is_valid_git_url(url: &str) -> bool {
    url.starts_with("https://")
        || url.starts_with("http://")
        || url.starts_with("git@")
        || url.starts_with("ssh://")
        || url.starts_with("file://")
}

/// Expand tilde in path
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path.starts_with("~/") || path == "~" {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        if path == "~" {
            Ok(home)
        } else {
            Ok(home.join(&path[2..]))
        }
    } else {
        Ok(PathBuf::from(path))
    }
}
