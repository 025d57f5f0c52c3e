//! Error taxonomy for repository reconciliation.
//!
//! Plumbing code (file IO, process spawning, config parsing) uses
//! `anyhow::Result`. The reconciler classifies every failure it can recover
//! from or report into a [`SyncError`], which is turned into a
//! [`SyncOutcome`](crate::sync::SyncOutcome) at the `sync_once` boundary.

use std::path::PathBuf;
use thiserror::Error;

use crate::sync::SyncOutcome;

/// Failures surfaced by the reconciler.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The repository could not be created, cloned or loaded. Fatal.
    #[error("repository setup failed at '{}': {detail}", path.display())]
    Setup { path: PathBuf, detail: String },

    /// A fetch or push could not reach the remote.
    #[error("{operation} failed: {detail}")]
    Network {
        operation: &'static str,
        detail: String,
    },

    /// Conflicts were declined, could not be edited, or auto-resolve is off.
    #[error("{0} conflicted file(s) left unresolved")]
    ConflictUnresolved(usize),

    /// The remote refused the push because it has moved ahead.
    #[error("push to origin/{branch} rejected: {detail}")]
    PushRejected { branch: String, detail: String },

    /// Local and remote share no common ancestor and unification failed.
    #[error("local and remote histories are unrelated: {0}")]
    UnrelatedHistories(String),

    /// Any other git step failed.
    #[error("{step} failed: {detail}")]
    Vcs { step: &'static str, detail: String },
}

impl SyncError {
    /// Wrap an `anyhow` error from a failed git step.
    pub fn vcs(step: &'static str, err: anyhow::Error) -> Self {
        SyncError::Vcs {
            step,
            detail: format!("{err:#}"),
        }
    }

    /// Wrap an `anyhow` error raised while acquiring the repository.
    pub fn setup(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        SyncError::Setup {
            path: path.into(),
            detail: format!("{err:#}"),
        }
    }

    /// The outcome reported for this error when it ends a sync.
    pub fn outcome(&self) -> SyncOutcome {
        match self {
            SyncError::Network { .. } => SyncOutcome::NetworkFailure,
            SyncError::ConflictUnresolved(_) => SyncOutcome::ConflictUnresolved,
            SyncError::PushRejected { .. } => SyncOutcome::PushRejected,
            SyncError::Setup { .. } | SyncError::UnrelatedHistories(_) | SyncError::Vcs { .. } => {
                SyncOutcome::Aborted
            }
        }
    }
}
