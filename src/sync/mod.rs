// Module declarations
mod init;
mod integrate;
mod message;
mod reconciler;
mod state;

// Re-export public types and functions
pub use init::acquire_repository;
pub use message::{commit_message, merge_message, render_message};
pub use reconciler::RepositoryReconciler;
pub use state::RepositoryState;

use serde::{Deserialize, Serialize};

/// Result of one `sync_once` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// Something was committed, integrated or pushed.
    Success,
    /// Local and remote already agreed and nothing needed committing.
    NoChanges,
    /// A merge or rebase stopped on conflicts that were not resolved.
    ConflictUnresolved,
    /// The remote kept rejecting the push after one re-integration.
    PushRejected,
    /// The remote could not be reached after one retry.
    NetworkFailure,
    /// A git step failed for any other reason.
    Aborted,
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, SyncOutcome::Success | SyncOutcome::NoChanges)
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SyncOutcome::Success => "success",
            SyncOutcome::NoChanges => "no changes",
            SyncOutcome::ConflictUnresolved => "conflict unresolved",
            SyncOutcome::PushRejected => "push rejected",
            SyncOutcome::NetworkFailure => "network failure",
            SyncOutcome::Aborted => "aborted",
        };
        write!(f, "{text}")
    }
}
