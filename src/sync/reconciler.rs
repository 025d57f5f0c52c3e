use chrono::Local;

use crate::config::{SyncConfig, SyncMode};
use crate::error::SyncError;
use crate::interactive_conflict::ConflictResolver;
use crate::logger::LogSink;
use crate::report::{StepLevel, SyncReport};
use crate::scm::{PushStatus, Scm};

use super::init::acquire_repository;
use super::message::commit_message;
use super::state::RepositoryState;
use super::SyncOutcome;

const REMOTE: &str = "origin";

/// Keeps one working copy in agreement with its remote branch.
///
/// Only one sync may run at a time; `sync_once` takes `&mut self`.
pub struct RepositoryReconciler {
    pub(super) config: SyncConfig,
    pub(super) scm: Box<dyn Scm>,
    pub(super) resolver: ConflictResolver,
    sink: Box<dyn LogSink>,
    report: SyncReport,
}

impl RepositoryReconciler {
    /// Acquire the repository (load, clone, or init) and bind a reconciler
    /// to it. Fails only with [`SyncError::Setup`].
    pub fn open(
        config: SyncConfig,
        resolver: ConflictResolver,
        mut sink: Box<dyn LogSink>,
    ) -> Result<Self, SyncError> {
        let scm = acquire_repository(&config, sink.as_mut())?;
        Ok(Self::with_scm(config, scm, resolver, sink))
    }

    /// Bind a reconciler to an already opened repository.
    pub fn with_scm(
        config: SyncConfig,
        scm: Box<dyn Scm>,
        resolver: ConflictResolver,
        sink: Box<dyn LogSink>,
    ) -> Self {
        let report = SyncReport::new(&config.branch, config.mode);
        RepositoryReconciler {
            config,
            scm,
            resolver,
            sink,
            report,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn scm(&self) -> &dyn Scm {
        self.scm.as_ref()
    }

    /// Run one full reconciliation. Never fails: every problem ends up in the
    /// returned report's outcome and step log.
    pub fn sync_once(&mut self) -> SyncReport {
        self.report = SyncReport::new(&self.config.branch, self.config.mode);
        self.info(format!(
            "Sync started on '{}' ({} mode)",
            self.config.branch, self.config.mode
        ));

        let result = match self.config.mode {
            SyncMode::Safe => self.run_safe(),
            SyncMode::Force => self.run_force(),
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = e.to_string();
                self.error(message.clone());
                self.report.error = Some(message);
                e.outcome()
            }
        };

        self.info(format!("Sync finished: {outcome}"));
        self.report.finish(outcome);
        std::mem::replace(
            &mut self.report,
            SyncReport::new(&self.config.branch, self.config.mode),
        )
    }

    fn run_safe(&mut self) -> Result<SyncOutcome, SyncError> {
        // A rebase detaches HEAD, so leftovers are settled before the branch
        // check rather than after it.
        let state = RepositoryState::probe(self.scm.as_ref())
            .map_err(|e| SyncError::vcs("state probe", e))?;
        if state.is_in_progress() {
            self.warn(format!("Found {state} left over from a previous run"));
            self.recover_interrupted(state)?;
        }

        self.ensure_branch()?;
        self.commit_local_changes(false)?;
        self.fetch_with_retry()?;

        let remote_ref = self.remote_ref();
        if !self.scm.ref_exists(&remote_ref) {
            if !self.scm.has_commits() {
                self.info("Nothing to publish yet");
                return Ok(SyncOutcome::NoChanges);
            }
            self.info(format!("{remote_ref} does not exist, publishing it"));
            self.publish(false)?;
            return Ok(SyncOutcome::Success);
        }

        self.integrate(&remote_ref)?;

        if self.needs_push(&remote_ref)? {
            self.publish(false)?;
        } else {
            self.info(format!("Local '{}' matches {remote_ref}", self.config.branch));
        }

        Ok(if self.report.did_work() {
            SyncOutcome::Success
        } else {
            SyncOutcome::NoChanges
        })
    }

    /// Commit everything, even nothing, and overwrite the remote branch.
    fn run_force(&mut self) -> Result<SyncOutcome, SyncError> {
        self.ensure_branch()?;
        self.commit_local_changes(true)?;
        self.publish(true)?;
        Ok(SyncOutcome::Success)
    }

    /// Check out the configured branch, creating it when missing.
    pub(super) fn ensure_branch(&mut self) -> Result<(), SyncError> {
        let branch = self.config.branch.clone();
        let current = self
            .scm
            .current_branch()
            .map_err(|e| SyncError::vcs("branch check", e))?;
        if current == branch {
            return Ok(());
        }

        let locals = self
            .scm
            .local_branches()
            .map_err(|e| SyncError::vcs("branch listing", e))?;

        if locals.contains(&branch) {
            self.scm
                .checkout(&branch)
                .map_err(|e| SyncError::vcs("checkout", e))?;
            self.info(format!("Switched to branch '{branch}'"));
        } else {
            // On an unborn HEAD a tracking checkout would clobber untracked
            // local files; start fresh and let integration bring the remote in.
            let remote_ref = self.remote_ref();
            if self.scm.has_commits() && self.scm.ref_exists(&remote_ref) {
                self.scm
                    .create_branch(&branch, Some(&remote_ref))
                    .map_err(|e| SyncError::vcs("checkout", e))?;
                self.info(format!("Created branch '{branch}' tracking {remote_ref}"));
            } else {
                self.scm
                    .create_branch(&branch, None)
                    .map_err(|e| SyncError::vcs("checkout", e))?;
                self.info(format!("Created new branch '{branch}'"));
            }
        }
        Ok(())
    }

    /// Stage the working tree and commit it when it differs from HEAD.
    /// Returns whether a commit was made.
    pub(super) fn commit_local_changes(&mut self, allow_empty: bool) -> Result<bool, SyncError> {
        self.scm
            .stage_all()
            .map_err(|e| SyncError::vcs("staging", e))?;

        let changed = self
            .scm
            .has_changes()
            .map_err(|e| SyncError::vcs("status", e))?;
        if !changed && !allow_empty {
            self.info("No local changes to commit");
            return Ok(false);
        }

        let count = self
            .scm
            .staged_file_count()
            .map_err(|e| SyncError::vcs("status", e))?;
        let message = commit_message(&self.config, Local::now().naive_local(), count);
        self.scm
            .commit(&message, allow_empty)
            .map_err(|e| SyncError::vcs("commit", e))?;

        self.report.commits_created += 1;
        self.info(format!("Committed: {message}"));
        Ok(true)
    }

    pub(super) fn fetch_with_retry(&mut self) -> Result<(), SyncError> {
        if let Err(first) = self.scm.fetch(REMOTE) {
            self.warn(format!("Fetch failed, retrying once: {first:#}"));
            if let Err(second) = self.scm.fetch(REMOTE) {
                return Err(SyncError::Network {
                    operation: "fetch",
                    detail: format!("{second:#}"),
                });
            }
        }
        self.info(format!("Fetched {REMOTE}"));
        Ok(())
    }

    fn needs_push(&self, remote_ref: &str) -> Result<bool, SyncError> {
        if !self.scm.has_commits() {
            return Ok(false);
        }
        let local = self
            .scm
            .resolve_ref("HEAD")
            .map_err(|e| SyncError::vcs("rev-parse", e))?;
        let remote = self
            .scm
            .resolve_ref(remote_ref)
            .map_err(|e| SyncError::vcs("rev-parse", e))?;
        Ok(local != remote)
    }

    /// Push the branch. A transport failure is retried once. In safe mode a
    /// rejection triggers one fetch and re-integration before pushing again.
    fn publish(&mut self, force: bool) -> Result<(), SyncError> {
        let branch = self.config.branch.clone();
        let mut retried_failure = false;
        let mut retried_rejection = false;

        loop {
            let status = self
                .scm
                .push(REMOTE, &branch, force)
                .map_err(|e| SyncError::vcs("push", e))?;

            match status {
                PushStatus::Pushed => {
                    self.report.pushed = true;
                    let verb = if force { "Force-pushed" } else { "Pushed" };
                    self.info(format!("{verb} to {REMOTE}/{branch}"));
                    return Ok(());
                }
                PushStatus::Rejected(detail) => {
                    if force || retried_rejection {
                        return Err(SyncError::PushRejected { branch, detail });
                    }
                    retried_rejection = true;
                    self.warn("Push rejected, integrating remote changes again");
                    self.fetch_with_retry()?;
                    let remote_ref = self.remote_ref();
                    self.integrate(&remote_ref)?;
                }
                PushStatus::Failed(detail) => {
                    if retried_failure {
                        return Err(SyncError::Network {
                            operation: "push",
                            detail,
                        });
                    }
                    retried_failure = true;
                    self.warn(format!("Push failed, retrying once: {detail}"));
                }
            }
        }
    }

    pub(super) fn remote_ref(&self) -> String {
        format!("{REMOTE}/{}", self.config.branch)
    }

    pub(super) fn report_mut(&mut self) -> &mut SyncReport {
        &mut self.report
    }

    pub(super) fn info(&mut self, message: impl Into<String>) {
        self.step(StepLevel::Info, message.into());
    }

    pub(super) fn warn(&mut self, message: impl Into<String>) {
        self.step(StepLevel::Warn, message.into());
    }

    pub(super) fn error(&mut self, message: impl Into<String>) {
        self.step(StepLevel::Error, message.into());
    }

    fn step(&mut self, level: StepLevel, message: String) {
        match level {
            StepLevel::Info => log::info!("{message}"),
            StepLevel::Warn => log::warn!("{message}"),
            StepLevel::Error => log::error!("{message}"),
        }
        let line = self.report.push_step(level, message).body();
        if let Err(e) = self.sink.write_line(&line) {
            log::warn!("Failed to write sync log: {e:#}");
        }
    }
}
