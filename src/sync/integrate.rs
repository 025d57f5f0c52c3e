use chrono::Local;

use crate::config::IntegrationStrategy;
use crate::error::SyncError;
use crate::scm::IntegrationStatus;

use super::message::merge_message;
use super::reconciler::RepositoryReconciler;
use super::state::RepositoryState;

/// The in-progress operation a conflict belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Operation {
    Merge,
    Rebase,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Merge => write!(f, "merge"),
            Operation::Rebase => write!(f, "rebase"),
        }
    }
}

impl RepositoryReconciler {
    /// Bring `remote_ref` into the current branch using the configured
    /// strategy. Does nothing when HEAD already contains the remote tip.
    pub(super) fn integrate(&mut self, remote_ref: &str) -> Result<(), SyncError> {
        if self.scm.has_commits() && self.contains(remote_ref)? {
            self.info(format!("Already up to date with {remote_ref}"));
            return Ok(());
        }

        match self.config.strategy {
            IntegrationStrategy::Merge => self.merge_remote(remote_ref),
            // Nothing to replay on an unborn branch.
            IntegrationStrategy::RebaseThenMerge if !self.scm.has_commits() => {
                self.merge_remote(remote_ref)
            }
            IntegrationStrategy::RebaseThenMerge => self.rebase_then_merge(remote_ref),
        }
    }

    /// Finish or abort a merge/rebase found in progress at the start of a sync.
    pub(super) fn recover_interrupted(&mut self, state: RepositoryState) -> Result<(), SyncError> {
        match state {
            RepositoryState::MergeInProgress => self.settle(Operation::Merge),
            RepositoryState::RebaseInProgress => self.settle(Operation::Rebase),
            RepositoryState::Clean | RepositoryState::UnrelatedHistories => Ok(()),
        }
    }

    fn contains(&self, remote_ref: &str) -> Result<bool, SyncError> {
        self.scm
            .is_ancestor(remote_ref, "HEAD")
            .map_err(|e| SyncError::vcs("ancestry check", e))
    }

    fn merge_remote(&mut self, remote_ref: &str) -> Result<(), SyncError> {
        let message = merge_message(&self.config, Local::now().naive_local());
        self.info(format!("Merging {remote_ref}"));

        let mut status = self
            .scm
            .merge(remote_ref, &message, false)
            .map_err(|e| SyncError::vcs("merge", e))?;

        if let IntegrationStatus::UnrelatedHistories(_) = status {
            self.warn("Histories are unrelated, retrying merge with --allow-unrelated-histories");
            let retry = self
                .scm
                .merge(remote_ref, &message, true)
                .map_err(|e| SyncError::vcs("merge", e))?;

            status = match retry {
                IntegrationStatus::UnrelatedHistories(detail) | IntegrationStatus::Failed(detail) => {
                    self.abort(Operation::Merge);
                    return Err(SyncError::UnrelatedHistories(detail));
                }
                other => other,
            };
        }

        match status {
            IntegrationStatus::Integrated => {
                self.report_mut().integrated = true;
                self.info(format!("Merged {remote_ref}"));
                Ok(())
            }
            IntegrationStatus::Conflicted => self.settle(Operation::Merge),
            IntegrationStatus::UnrelatedHistories(detail) => {
                self.abort(Operation::Merge);
                Err(SyncError::UnrelatedHistories(detail))
            }
            IntegrationStatus::Failed(detail) => {
                self.abort(Operation::Merge);
                Err(SyncError::Vcs {
                    step: "merge",
                    detail,
                })
            }
        }
    }

    /// Replay local commits onto the remote tip, then merge whatever is left.
    /// A rebase that fails for any reason but conflicts falls back to a plain
    /// merge.
    fn rebase_then_merge(&mut self, remote_ref: &str) -> Result<(), SyncError> {
        self.info(format!("Rebasing onto {remote_ref}"));
        let status = self
            .scm
            .rebase(remote_ref)
            .map_err(|e| SyncError::vcs("rebase", e))?;

        match status {
            IntegrationStatus::Integrated => {
                self.report_mut().integrated = true;
                self.info(format!("Rebased onto {remote_ref}"));
            }
            IntegrationStatus::Conflicted => self.settle(Operation::Rebase)?,
            IntegrationStatus::UnrelatedHistories(detail) | IntegrationStatus::Failed(detail) => {
                self.warn(format!("Rebase failed, falling back to merge: {detail}"));
                self.abort(Operation::Rebase);
            }
        }

        if self.contains(remote_ref)? {
            return Ok(());
        }
        self.merge_remote(remote_ref)
    }

    /// Drive an in-progress operation to completion, resolving conflicts on
    /// every stop. On any failure the operation is aborted so no merge or
    /// rebase is left behind.
    pub(super) fn settle(&mut self, op: Operation) -> Result<(), SyncError> {
        let mut empty_stops = 0;

        loop {
            let conflicts = match self.scm.conflicted_files() {
                Ok(conflicts) => conflicts,
                Err(e) => {
                    self.abort(op);
                    return Err(SyncError::vcs("conflict listing", e));
                }
            };

            if !conflicts.is_empty() {
                let paths = conflicts.paths();
                self.warn(format!(
                    "{op} stopped on {} conflicted file(s): {}",
                    paths.len(),
                    paths.join(", ")
                ));
                for path in paths {
                    if !self.report_mut().conflicts.contains(&path) {
                        self.report_mut().conflicts.push(path);
                    }
                }

                if !self.config.auto_resolve_conflicts {
                    self.info("Automatic conflict resolution is disabled");
                    self.abort(op);
                    return Err(SyncError::ConflictUnresolved(conflicts.len()));
                }

                if !self.resolver.resolve(&conflicts, self.scm.as_ref()) {
                    self.abort(op);
                    return Err(SyncError::ConflictUnresolved(conflicts.len()));
                }
                self.info(format!("Resolved {} file(s)", conflicts.len()));
            }

            match op {
                Operation::Merge => {
                    let message = merge_message(&self.config, Local::now().naive_local());
                    if let Err(e) = self.scm.commit(&message, false) {
                        self.abort(op);
                        return Err(SyncError::vcs("merge commit", e));
                    }
                    self.info(format!("Committed merge: {message}"));
                    break;
                }
                Operation::Rebase => {
                    let status = match self.scm.rebase_continue() {
                        Ok(status) => status,
                        Err(e) => {
                            self.abort(op);
                            return Err(SyncError::vcs("rebase", e));
                        }
                    };
                    match status {
                        IntegrationStatus::Integrated => {
                            self.info("Rebase completed");
                            break;
                        }
                        IntegrationStatus::Conflicted => {
                            // Two stops in a row with nothing to resolve
                            // means git is not making progress.
                            if conflicts.is_empty() {
                                empty_stops += 1;
                                if empty_stops > 1 {
                                    self.abort(op);
                                    return Err(SyncError::Vcs {
                                        step: "rebase",
                                        detail: "rebase stopped without conflicted paths"
                                            .to_string(),
                                    });
                                }
                            } else {
                                empty_stops = 0;
                            }
                        }
                        IntegrationStatus::UnrelatedHistories(detail)
                        | IntegrationStatus::Failed(detail) => {
                            self.abort(op);
                            return Err(SyncError::Vcs {
                                step: "rebase",
                                detail,
                            });
                        }
                    }
                }
            }
        }

        self.report_mut().integrated = true;
        Ok(())
    }

    /// Abort `op` if it is still in progress. Failures are logged only.
    fn abort(&mut self, op: Operation) {
        let state = match RepositoryState::probe(self.scm.as_ref()) {
            Ok(state) => state,
            Err(e) => {
                self.warn(format!("Could not probe repository state: {e:#}"));
                return;
            }
        };

        let result = match (op, state) {
            (Operation::Merge, RepositoryState::MergeInProgress) => self.scm.merge_abort(),
            (Operation::Rebase, RepositoryState::RebaseInProgress) => self.scm.rebase_abort(),
            _ => return,
        };

        match result {
            Ok(()) => self.warn(format!("Aborted {op}")),
            Err(e) => self.error(format!("Failed to abort {op}: {e:#}")),
        }
    }
}
