use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::{ConfigManager, SyncMode};
use crate::sync::SyncOutcome;

/// Severity of a step log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepLevel {
    Info,
    Warn,
    Error,
}

/// One line of the per-step sync log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: StepLevel,
    pub message: String,
}

impl LogEntry {
    /// `LEVEL message`, without the timestamp
    pub fn body(&self) -> String {
        let level = match self.level {
            StepLevel::Info => "INFO ",
            StepLevel::Warn => "WARN ",
            StepLevel::Error => "ERROR",
        };
        format!("{} {}", level, self.message)
    }

    /// Render as `[YYYY-mm-dd HH:MM:SS] LEVEL message`
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.body()
        )
    }
}

/// What a single sync did and how it ended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub branch: String,
    pub mode: SyncMode,
    pub started_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Local>>,
    /// Commits created from local changes (merge commits are not counted)
    pub commits_created: usize,
    /// Remote history was merged or rebased in
    pub integrated: bool,
    pub pushed: bool,
    /// Every conflicted path seen during the sync
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<LogEntry>,
}

impl SyncReport {
    pub fn new(branch: &str, mode: SyncMode) -> Self {
        SyncReport {
            outcome: SyncOutcome::NoChanges,
            branch: branch.to_string(),
            mode,
            started_at: Local::now(),
            finished_at: None,
            commits_created: 0,
            integrated: false,
            pushed: false,
            conflicts: Vec::new(),
            error: None,
            steps: Vec::new(),
        }
    }

    pub fn push_step(&mut self, level: StepLevel, message: impl Into<String>) -> &LogEntry {
        self.steps.push(LogEntry {
            timestamp: Local::now(),
            level,
            message: message.into(),
        });
        &self.steps[self.steps.len() - 1]
    }

    /// True when the sync changed something locally or remotely
    pub fn did_work(&self) -> bool {
        self.commits_created > 0 || self.integrated || self.pushed
    }

    pub fn finish(&mut self, outcome: SyncOutcome) {
        self.outcome = outcome;
        self.finished_at = Some(Local::now());
    }

    /// Human-readable per-step log
    pub fn log_text(&self) -> String {
        self.steps
            .iter()
            .map(LogEntry::to_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Save as pretty JSON to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize sync report")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write sync report: {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read sync report: {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse sync report")
    }

    /// Save as the most recent report in the config directory
    pub fn save_last(&self) -> Result<()> {
        self.save(&ConfigManager::last_report_path()?)
    }

    /// Load the most recent report, if any sync has run
    pub fn load_last() -> Result<Option<Self>> {
        let path = ConfigManager::last_report_path()?;
        if !path.exists() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    /// Print a summary to the console
    pub fn print_summary(&self, verbose: bool) {
        println!("\n{}", "=== Sync Summary ===".bold().cyan());

        let outcome = self.outcome.to_string();
        let outcome = match self.outcome {
            SyncOutcome::Success => outcome.green().bold(),
            SyncOutcome::NoChanges => outcome.dimmed(),
            _ => outcome.red().bold(),
        };
        println!("  {} {}", "Outcome:".bold(), outcome);
        println!("  {} {} ({} mode)", "Branch:".bold(), self.branch.cyan(), self.mode);
        println!(
            "  {} {}",
            "Started:".bold(),
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!(
            "  {} {}    {} {}    {} {}",
            "Commits:".bold(),
            self.commits_created,
            "Integrated:".bold(),
            yes_no(self.integrated),
            "Pushed:".bold(),
            yes_no(self.pushed)
        );

        if !self.conflicts.is_empty() {
            println!("  {}", "Conflicted files:".yellow().bold());
            for path in &self.conflicts {
                println!("    {} {}", "CONFLICT".yellow(), path);
            }
        }

        if let Some(error) = &self.error {
            println!("  {} {}", "Error:".red().bold(), error);
        }

        if verbose {
            println!("\n{}", "Steps:".bold());
            for entry in &self.steps {
                println!("  {}", entry.to_line().dimmed());
            }
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
