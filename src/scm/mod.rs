//! SCM (Source Control Management) abstraction layer.
//!
//! The reconciler only talks to the repository through the [`Scm`] trait;
//! [`GitScm`] implements it on top of the git CLI.

mod git;

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::conflict::ConflictSet;

pub use git::GitScm;

/// Result of an attempt to bring another history into the current branch
/// (merge, rebase, or rebase continuation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationStatus {
    /// Finished with no operation left in progress.
    Integrated,
    /// Stopped with unmerged paths; the operation is still in progress.
    Conflicted,
    /// Refused because the histories share no common ancestor.
    UnrelatedHistories(String),
    /// Any other failure, with git's output.
    Failed(String),
}

/// Result of a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushStatus {
    Pushed,
    /// The remote has commits the local branch lacks.
    Rejected(String),
    /// Transport, authentication or other failure.
    Failed(String),
}

/// Trait for source control management operations.
pub trait Scm: Send + Sync {
    /// Root of the working tree.
    fn workdir(&self) -> &Path;

    /// Absolute path of the repository metadata directory.
    fn git_dir(&self) -> Result<PathBuf>;

    /// Get the current branch name (empty when HEAD is detached).
    fn current_branch(&self) -> Result<String>;

    /// Names of all local branches.
    fn local_branches(&self) -> Result<Vec<String>>;

    /// Whether HEAD points to a commit (false on an unborn branch).
    fn has_commits(&self) -> bool;

    /// Whether `refname` resolves to a commit.
    fn ref_exists(&self, refname: &str) -> bool;

    /// Resolve `refname` to a full commit hash.
    fn resolve_ref(&self, refname: &str) -> Result<String>;

    /// Whether `ancestor` is reachable from `descendant`.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    /// Check out an existing local branch.
    fn checkout(&self, branch: &str) -> Result<()>;

    /// Create and check out `branch`, tracking `upstream` when given.
    fn create_branch(&self, branch: &str, upstream: Option<&str>) -> Result<()>;

    /// Stage all changes (add and remove).
    fn stage_all(&self) -> Result<()>;

    /// Stage one path, including its deletion.
    fn stage_path(&self, path: &str) -> Result<()>;

    /// Check if there are uncommitted or untracked changes.
    fn has_changes(&self) -> Result<bool>;

    /// Number of paths whose staged content differs from HEAD.
    fn staged_file_count(&self) -> Result<usize>;

    /// Commit staged changes with a message.
    fn commit(&self, message: &str, allow_empty: bool) -> Result<()>;

    /// Fetch from a remote repository.
    fn fetch(&self, remote: &str) -> Result<()>;

    /// Merge `target` into the current branch, fast-forwarding when possible.
    fn merge(&self, target: &str, message: &str, allow_unrelated: bool)
        -> Result<IntegrationStatus>;

    /// Abort an in-progress merge.
    fn merge_abort(&self) -> Result<()>;

    /// Rebase the current branch onto `upstream`.
    fn rebase(&self, upstream: &str) -> Result<IntegrationStatus>;

    /// Continue an in-progress rebase after conflicts were staged.
    fn rebase_continue(&self) -> Result<IntegrationStatus>;

    /// Abort an in-progress rebase.
    fn rebase_abort(&self) -> Result<()>;

    /// Push `branch` to `remote`, setting upstream.
    fn push(&self, remote: &str, branch: &str, force: bool) -> Result<PushStatus>;

    /// Paths currently unmerged in the index.
    fn conflicted_files(&self) -> Result<ConflictSet>;

    /// Check if a remote exists.
    fn has_remote(&self, name: &str) -> bool;

    /// Get the URL for a remote.
    fn get_remote_url(&self, name: &str) -> Result<String>;

    /// Add a remote repository.
    fn add_remote(&self, name: &str, url: &str) -> Result<()>;

    /// Set or update the URL for a remote.
    fn set_remote_url(&self, name: &str, url: &str) -> Result<()>;

    /// Read a repository config value, `None` when unset.
    fn config_value(&self, key: &str) -> Option<String>;

    /// Write a repository-local config value.
    fn set_config(&self, key: &str, value: &str) -> Result<()>;
}

/// Check if a directory is a Git repository.
pub fn is_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Whether the `git` binary can be run.
pub fn is_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Open an existing Git repository.
pub fn open(path: &Path) -> Result<Box<dyn Scm>> {
    if is_repo(path) {
        Ok(Box::new(GitScm::open(path)?))
    } else {
        Err(anyhow!(
            "No Git repository found at '{}'. Expected .git directory.",
            path.display()
        ))
    }
}

/// Initialize a new Git repository.
pub fn init(path: &Path) -> Result<Box<dyn Scm>> {
    Ok(Box::new(GitScm::init(path)?))
}

/// Clone a repository from a URL, checking out `branch` when given.
pub fn clone(url: &str, path: &Path, branch: Option<&str>) -> Result<Box<dyn Scm>> {
    Ok(Box::new(GitScm::clone(url, path, branch)?))
}

/// Set a committer identity on the repository unless one is already
/// configured (locally or globally).
pub fn ensure_identity(scm: &dyn Scm, name: &str, email: &str) -> Result<()> {
    if scm.config_value("user.name").is_none() {
        scm.set_config("user.name", name)?;
    }
    if scm.config_value("user.email").is_none() {
        scm.set_config("user.email", email)?;
    }
    Ok(())
}
