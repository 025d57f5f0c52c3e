use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use inquire::Confirm;
use std::path::Path;
use std::process::Command;

use crate::conflict::{file_has_conflict_markers, ConflictEntry, ConflictSet};
use crate::scm::Scm;

/// Opens a file for a human to edit and returns when the session ends.
pub trait Editor {
    fn edit(&mut self, file: &Path) -> Result<()>;
}

/// Synchronous yes/no questions to the human at the console.
pub trait Prompter {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;
}

/// Check if we're running in an interactive terminal
pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout)
}

/// Runs an external editor command on the file and waits for it to exit.
///
/// The command is taken from the configuration, then `$VISUAL`, then
/// `$EDITOR`, then `notepad` on Windows or `vi` elsewhere. It may carry
/// arguments (`"code --wait"`); the file path is appended last.
pub struct CommandEditor {
    command: Option<String>,
}

impl CommandEditor {
    pub fn new(command: Option<String>) -> Self {
        CommandEditor { command }
    }

    pub fn resolve_command(&self) -> String {
        self.command
            .clone()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| std::env::var("VISUAL").ok().filter(|c| !c.trim().is_empty()))
            .or_else(|| std::env::var("EDITOR").ok().filter(|c| !c.trim().is_empty()))
            .unwrap_or_else(|| {
                if cfg!(windows) {
                    "notepad".to_string()
                } else {
                    "vi".to_string()
                }
            })
    }
}

impl Editor for CommandEditor {
    fn edit(&mut self, file: &Path) -> Result<()> {
        let command = self.resolve_command();
        let mut parts = command.split_whitespace();
        let program = parts.next().context("Editor command is empty")?;

        let status = Command::new(program)
            .args(parts)
            .arg(file)
            .status()
            .with_context(|| format!("Failed to launch editor '{command}'"))?;

        if !status.success() {
            return Err(anyhow!("Editor '{}' exited with {}", command, status));
        }
        Ok(())
    }
}

/// Console prompts via `inquire`. Fails when there is no terminal to ask.
#[derive(Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        if !is_interactive() {
            return Err(anyhow!("Cannot ask '{question}': not an interactive terminal"));
        }
        Confirm::new(question)
            .with_default(default)
            .prompt()
            .context("Failed to get confirmation")
    }
}

/// Drives a human through every conflicted path and stages the results.
pub struct ConflictResolver {
    editor: Box<dyn Editor>,
    prompter: Box<dyn Prompter>,
}

impl ConflictResolver {
    pub fn new(editor: Box<dyn Editor>, prompter: Box<dyn Prompter>) -> Self {
        ConflictResolver { editor, prompter }
    }

    /// Resolver using the configured editor and console prompts.
    pub fn terminal(editor_command: Option<String>) -> Self {
        Self::new(
            Box::new(CommandEditor::new(editor_command)),
            Box::new(TerminalPrompter),
        )
    }

    /// Resolve every path in `conflicts`.
    ///
    /// Returns `true` only when each path ended up staged without conflict
    /// markers. Any declined prompt, unanswerable prompt, or staging failure
    /// returns `false`. An editor that fails to launch lets the human choose
    /// between moving on to the next path and stopping; either way the result
    /// is `false`.
    pub fn resolve(&mut self, conflicts: &ConflictSet, scm: &dyn Scm) -> bool {
        if conflicts.is_empty() {
            return true;
        }

        let total = conflicts.len();
        println!(
            "\n{}",
            format!("Found {total} conflicted file(s) to resolve").yellow().bold()
        );

        let mut all_staged = true;
        for (idx, entry) in conflicts.iter().enumerate() {
            println!(
                "\n{} Conflict {} of {}: {} ({})",
                ">>>".yellow().bold(),
                (idx + 1).to_string().cyan(),
                total.to_string().cyan(),
                entry.path.bold(),
                entry.kind
            );

            match self.resolve_entry(entry, scm) {
                EntryResult::Staged => {
                    println!("  {} {} staged", "✓".green(), entry.path);
                }
                EntryResult::Skipped => {
                    all_staged = false;
                }
                EntryResult::Stop => {
                    log::warn!("Conflict resolution stopped at {}", entry.path);
                    return false;
                }
            }
        }

        all_staged
    }

    fn resolve_entry(&mut self, entry: &ConflictEntry, scm: &dyn Scm) -> EntryResult {
        let full_path = scm.workdir().join(&entry.path);

        if !full_path.exists() {
            let question = format!("'{}' was {}. Accept the deletion?", entry.path, entry.kind);
            return match self.ask(&question, true) {
                Some(true) => self.stage(entry, scm),
                _ => EntryResult::Stop,
            };
        }

        loop {
            println!(
                "  Remove the conflict markers (<<<<<<<, =======, >>>>>>>), save and close the editor."
            );

            if let Err(e) = self.editor.edit(&full_path) {
                eprintln!("  {} {:#}", "✗ Editor failed:".red(), e);
                log::error!("Editor failed for {}: {:#}", entry.path, e);
                return match self.ask("Continue with the remaining files?", false) {
                    Some(true) => EntryResult::Skipped,
                    _ => EntryResult::Stop,
                };
            }

            match self.ask(&format!("Finished editing '{}'?", entry.path), true) {
                Some(true) => {}
                Some(false) => continue,
                None => return EntryResult::Stop,
            }

            match file_has_conflict_markers(&full_path) {
                Ok(false) => return self.stage(entry, scm),
                Ok(true) => {
                    println!(
                        "  {} '{}' still contains conflict markers",
                        "!".yellow().bold(),
                        entry.path
                    );
                    match self.ask("Edit it again?", true) {
                        Some(true) => continue,
                        _ => return EntryResult::Stop,
                    }
                }
                Err(e) => {
                    log::error!("Could not verify {}: {:#}", entry.path, e);
                    return EntryResult::Stop;
                }
            }
        }
    }

    fn stage(&self, entry: &ConflictEntry, scm: &dyn Scm) -> EntryResult {
        match scm.stage_path(&entry.path) {
            Ok(()) => EntryResult::Staged,
            Err(e) => {
                log::error!("Failed to stage {}: {:#}", entry.path, e);
                EntryResult::Stop
            }
        }
    }

    /// `None` when the prompt could not be answered.
    fn ask(&mut self, question: &str, default: bool) -> Option<bool> {
        match self.prompter.confirm(question, default) {
            Ok(answer) => Some(answer),
            Err(e) => {
                log::warn!("{e:#}");
                None
            }
        }
    }
}

enum EntryResult {
    Staged,
    Skipped,
    Stop,
}
