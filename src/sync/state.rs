use anyhow::Result;

use crate::scm::Scm;

/// Repository condition derived on every sync, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryState {
    Clean,
    MergeInProgress,
    RebaseInProgress,
    /// Integration was refused for lack of a common ancestor. Only produced
    /// by an integration attempt; the marker-file probe never returns it.
    UnrelatedHistories,
}

impl RepositoryState {
    /// Probe the git directory for merge and rebase marker files.
    pub fn probe(scm: &dyn Scm) -> Result<Self> {
        let git_dir = scm.git_dir()?;

        if git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists() {
            Ok(RepositoryState::RebaseInProgress)
        } else if git_dir.join("MERGE_HEAD").exists() {
            Ok(RepositoryState::MergeInProgress)
        } else {
            Ok(RepositoryState::Clean)
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            RepositoryState::MergeInProgress | RepositoryState::RebaseInProgress
        )
    }
}

impl std::fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RepositoryState::Clean => "clean",
            RepositoryState::MergeInProgress => "merge in progress",
            RepositoryState::RebaseInProgress => "rebase in progress",
            RepositoryState::UnrelatedHistories => "unrelated histories",
        };
        write!(f, "{text}")
    }
}
