use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::ConfigManager;

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// Initialize console logging.
///
/// Console verbosity is controlled via the `RUST_LOG` environment variable
/// (`error`, `warn`, `info`, `debug`, `trace`, `off`) and defaults to `info`.
/// Per-sync step logs additionally go to whatever [`LogSink`] the reconciler
/// was given, usually a [`FileSink`] on the log file in the config directory:
/// - Linux: ~/.config/git-autosync/git-autosync.log or $XDG_CONFIG_HOME/git-autosync/git-autosync.log
/// - macOS: ~/Library/Application Support/git-autosync/git-autosync.log
/// - Windows: %APPDATA%\git-autosync\git-autosync.log
pub fn init_logger() -> Result<()> {
    ConfigManager::ensure_config_dir()?;

    let default_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(default_level)
        .target(env_logger::Target::Stdout)
        .try_init()
        .ok(); // Ignore error if logger is already initialized

    Ok(())
}

/// Destination for the timestamped, append-only sync log.
pub trait LogSink: Send {
    fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Appends lines to a log file, rotating it when it grows past 10MB.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into() }
    }

    /// Sink on the default log file in the config directory.
    pub fn default_location() -> Result<Self> {
        ConfigManager::ensure_config_dir()?;
        Ok(Self::new(ConfigManager::log_file_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn write_line(&mut self, line: &str) -> Result<()> {
        rotate_log_if_needed(&self.path)?;
        append_line(&self.path, line)
    }
}

/// Keeps lines in memory; clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn write_line(&mut self, line: &str) -> Result<()> {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
        Ok(())
    }
}

/// Append a timestamped line to `path`
pub fn append_line(path: &Path, message: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        message
    )?;

    Ok(())
}

/// Rotate the log file if it exceeds 10MB
pub fn rotate_log_if_needed(log_path: &Path) -> Result<()> {
    if log_path.exists() {
        let metadata = std::fs::metadata(log_path)?;

        if metadata.len() > MAX_LOG_SIZE {
            let old_log_path = log_path.with_extension("log.old");

            if old_log_path.exists() {
                std::fs::remove_file(&old_log_path)?;
            }

            std::fs::rename(log_path, &old_log_path)?;

            log::info!("Log file rotated to {}", old_log_path.display());
        }
    }

    Ok(())
}
