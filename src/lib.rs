//! # git-autosync
//!
//! A command-line tool that keeps a local working directory and a branch on a
//! remote Git repository in agreement.
//!
//! ## Overview
//!
//! Each sync commits local edits, fetches the remote, integrates remote
//! history (merge, or rebase then merge), walks a human through any conflicts
//! in their editor, and pushes. A sync never fails loudly: it ends with a
//! [`sync::SyncOutcome`] and a per-step log, and the next scheduled sync is
//! the retry.
//!
//! ## Key Features
//!
//! - **Clone-or-init setup**: an empty directory is cloned, anything else becomes a new repository
//! - **Safe and force modes**: integrate-then-push, or overwrite the remote branch
//! - **Interactive resolution**: conflicted files open in `$VISUAL` / `$EDITOR`, markers are verified before staging
//! - **Recovery**: a merge or rebase left behind by an interrupted run is finished or aborted
//! - **Cross-platform**: platform-specific config directories on Linux, macOS, and Windows
//!
//! ## Architecture
//!
//! - Configuration ([`config`], [`onboarding`])
//! - Git operations behind a trait ([`scm`])
//! - Conflict detection and resolution ([`conflict`], [`interactive_conflict`])
//! - Reconciliation engine ([`sync`], [`error`])
//! - Logging and reporting ([`logger`], [`report`])
//! - Command handlers for the binary ([`handlers`])

/// Platform-agnostic configuration directory management and the sync settings.
///
/// Follows platform conventions (XDG on Linux, Application Support on macOS,
/// AppData on Windows) and validates settings on load.
pub mod config;

/// Unmerged path detection from `git status` and conflict marker checks.
pub mod conflict;

/// Failure taxonomy of the reconciler and its mapping to sync outcomes.
pub mod error;

/// Command handlers used by the `git-autosync` binary.
pub mod handlers;

/// Editor- and prompt-driven conflict resolution.
///
/// Opens each conflicted file in an external editor, asks the human to confirm
/// when done, refuses files that still carry conflict markers, and stages the
/// result. The editor and the console are behind the [`interactive_conflict::Editor`]
/// and [`interactive_conflict::Prompter`] traits so either can be replaced.
pub mod interactive_conflict;

/// Logging configuration and the per-sync log sinks.
///
/// Console output goes through `env_logger` (configurable via `RUST_LOG`);
/// sync steps are also appended to a log file in the config directory, with
/// rotation once it exceeds 10MB.
pub mod logger;

/// Interactive `init` wizard.
pub mod onboarding;

/// Sync reports: outcome, counters, conflicted paths and the step log.
///
/// The most recent report is kept as JSON in the config directory for
/// `status`.
pub mod report;

/// Source control abstraction and its git CLI implementation.
pub mod scm;

/// Core reconciliation logic.
///
/// Implements repository acquisition (load, clone, or init), the safe-mode
/// sequence (commit, fetch, integrate, resolve, push), force mode, and
/// recovery of interrupted merges and rebases.
pub mod sync;
