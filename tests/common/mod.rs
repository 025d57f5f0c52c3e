//! Shared fixtures: a bare "origin" in a temp dir, working copies synced
//! against it, and scripted stand-ins for the editor and the console.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use git_autosync::config::SyncConfig;
use git_autosync::conflict::ConflictSet;
use git_autosync::interactive_conflict::{ConflictResolver, Editor, Prompter};
use git_autosync::logger::MemorySink;
use git_autosync::scm::{IntegrationStatus, PushStatus, Scm};
use git_autosync::sync::RepositoryReconciler;

/// Run git in `dir`, panicking with its stderr on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_EDITOR", "true")
        .env("GIT_MERGE_AUTOEDIT", "no")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Run git in `dir` and report whether it succeeded.
pub fn git_succeeds(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_EDITOR", "true")
        .env("GIT_MERGE_AUTOEDIT", "no")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A bare repository playing the remote, plus room for working copies.
pub struct TestRemote {
    pub temp: TempDir,
    pub path: PathBuf,
}

impl TestRemote {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("origin.git");
        fs::create_dir_all(&path).unwrap();
        git(&path, &["init", "--bare"]);
        TestRemote { temp, path }
    }

    pub fn url(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    /// Configuration for a working copy named `who`. Every copy lives in a
    /// directory called `notes` so generated READMEs match across copies.
    pub fn config(&self, who: &str) -> SyncConfig {
        SyncConfig::new(self.temp.path().join(who).join("notes"), self.url())
    }

    /// Commit hash of `branch` on the remote.
    pub fn tip(&self, branch: &str) -> String {
        git(&self.path, &["rev-parse", branch])
    }

    pub fn commit_count(&self, branch: &str) -> usize {
        git(&self.path, &["rev-list", "--count", branch])
            .parse()
            .unwrap()
    }

    pub fn merge_count(&self, branch: &str) -> usize {
        git(&self.path, &["rev-list", "--merges", "--count", branch])
            .parse()
            .unwrap()
    }

    /// A plain clone of `main` named `who`, committing outside any reconciler.
    pub fn rival(&self, who: &str) -> PathBuf {
        let dir = self.temp.path().join(who);
        git(
            self.temp.path(),
            &["clone", "--branch", "main", &self.url(), &dir.to_string_lossy()],
        );
        git(&dir, &["config", "user.name", who]);
        git(&dir, &["config", "user.email", &format!("{who}@example.com")]);
        dir
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", branch])
            .current_dir(&self.path)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Every question asked and every file opened, shared with the test.
#[derive(Clone, Default)]
pub struct Transcript {
    pub questions: Arc<Mutex<Vec<String>>>,
    pub edited: Arc<Mutex<Vec<PathBuf>>>,
}

impl Transcript {
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }

    pub fn edited(&self) -> Vec<PathBuf> {
        self.edited.lock().unwrap().clone()
    }
}

/// Answers questions from a script; an unscripted question is an error,
/// like a console nobody is sitting at.
pub struct ScriptedPrompter {
    answers: VecDeque<bool>,
    transcript: Transcript,
}

impl ScriptedPrompter {
    pub fn new(answers: &[bool], transcript: &Transcript) -> Self {
        ScriptedPrompter {
            answers: answers.iter().copied().collect(),
            transcript: transcript.clone(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str, _default: bool) -> Result<bool> {
        self.transcript
            .questions
            .lock()
            .unwrap()
            .push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted answer for '{question}'"))
    }
}

/// Overwrites the file with fixed content, as a human fixing it would.
pub struct ScriptedEditor {
    content: String,
    transcript: Transcript,
}

impl ScriptedEditor {
    pub fn new(content: &str, transcript: &Transcript) -> Self {
        ScriptedEditor {
            content: content.to_string(),
            transcript: transcript.clone(),
        }
    }
}

impl Editor for ScriptedEditor {
    fn edit(&mut self, file: &Path) -> Result<()> {
        self.transcript
            .edited
            .lock()
            .unwrap()
            .push(file.to_path_buf());
        fs::write(file, &self.content)?;
        Ok(())
    }
}

/// An editor that cannot be started.
pub struct BrokenEditor;

impl Editor for BrokenEditor {
    fn edit(&mut self, _file: &Path) -> Result<()> {
        Err(anyhow!("Failed to launch editor 'missing-editor'"))
    }
}

/// A resolver that records any use and cannot answer questions.
pub fn untouched_resolver(transcript: &Transcript) -> ConflictResolver {
    ConflictResolver::new(
        Box::new(ScriptedEditor::new("", transcript)),
        Box::new(ScriptedPrompter::new(&[], transcript)),
    )
}

/// A resolver that writes `content` and confirms once per file.
pub fn editing_resolver(content: &str, files: usize, transcript: &Transcript) -> ConflictResolver {
    ConflictResolver::new(
        Box::new(ScriptedEditor::new(content, transcript)),
        Box::new(ScriptedPrompter::new(&vec![true; files], transcript)),
    )
}

/// Open a reconciler on `config` with an in-memory log.
pub fn open(config: SyncConfig, resolver: ConflictResolver) -> (RepositoryReconciler, MemorySink) {
    let sink = MemorySink::new();
    let reconciler = RepositoryReconciler::open(config, resolver, Box::new(sink.clone()))
        .expect("repository setup failed");
    (reconciler, sink)
}

pub fn git_available() -> bool {
    git_autosync::scm::is_available()
}

/// What happens to a push before it reaches the remote.
pub enum PushHazard {
    /// The rival clone publishes a commit just before each of the first
    /// `times` pushes.
    Race { rival: PathBuf, times: usize },
    /// The remote cannot be reached at all.
    Unreachable,
}

/// Wraps a real repository and interferes with its pushes.
pub struct InterferingScm {
    inner: Box<dyn Scm>,
    hazard: PushHazard,
    pushes: Arc<AtomicUsize>,
}

impl InterferingScm {
    /// Returns the wrapper and a counter of attempted pushes.
    pub fn new(inner: Box<dyn Scm>, hazard: PushHazard) -> (Self, Arc<AtomicUsize>) {
        let pushes = Arc::new(AtomicUsize::new(0));
        let scm = InterferingScm {
            inner,
            hazard,
            pushes: pushes.clone(),
        };
        (scm, pushes)
    }
}

impl Scm for InterferingScm {
    fn workdir(&self) -> &Path {
        self.inner.workdir()
    }
    fn git_dir(&self) -> Result<PathBuf> {
        self.inner.git_dir()
    }
    fn current_branch(&self) -> Result<String> {
        self.inner.current_branch()
    }
    fn local_branches(&self) -> Result<Vec<String>> {
        self.inner.local_branches()
    }
    fn has_commits(&self) -> bool {
        self.inner.has_commits()
    }
    fn ref_exists(&self, refname: &str) -> bool {
        self.inner.ref_exists(refname)
    }
    fn resolve_ref(&self, refname: &str) -> Result<String> {
        self.inner.resolve_ref(refname)
    }
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        self.inner.is_ancestor(ancestor, descendant)
    }
    fn checkout(&self, branch: &str) -> Result<()> {
        self.inner.checkout(branch)
    }
    fn create_branch(&self, branch: &str, upstream: Option<&str>) -> Result<()> {
        self.inner.create_branch(branch, upstream)
    }
    fn stage_all(&self) -> Result<()> {
        self.inner.stage_all()
    }
    fn stage_path(&self, path: &str) -> Result<()> {
        self.inner.stage_path(path)
    }
    fn has_changes(&self) -> Result<bool> {
        self.inner.has_changes()
    }
    fn staged_file_count(&self) -> Result<usize> {
        self.inner.staged_file_count()
    }
    fn commit(&self, message: &str, allow_empty: bool) -> Result<()> {
        self.inner.commit(message, allow_empty)
    }
    fn fetch(&self, remote: &str) -> Result<()> {
        self.inner.fetch(remote)
    }
    fn merge(&self, target: &str, message: &str, allow_unrelated: bool) -> Result<IntegrationStatus> {
        self.inner.merge(target, message, allow_unrelated)
    }
    fn merge_abort(&self) -> Result<()> {
        self.inner.merge_abort()
    }
    fn rebase(&self, upstream: &str) -> Result<IntegrationStatus> {
        self.inner.rebase(upstream)
    }
    fn rebase_continue(&self) -> Result<IntegrationStatus> {
        self.inner.rebase_continue()
    }
    fn rebase_abort(&self) -> Result<()> {
        self.inner.rebase_abort()
    }

    fn push(&self, remote: &str, branch: &str, force: bool) -> Result<PushStatus> {
        let attempt = self.pushes.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.hazard {
            PushHazard::Race { rival, times } => {
                if attempt <= *times {
                    let name = format!("rival-{attempt}.txt");
                    fs::write(rival.join(&name), "rival\n")?;
                    git(rival, &["add", "-A"]);
                    git(rival, &["commit", "-m", &format!("rival commit {attempt}")]);
                    git(rival, &["push", "origin", "main"]);
                }
                self.inner.push(remote, branch, force)
            }
            PushHazard::Unreachable => Ok(PushStatus::Failed(
                "fatal: unable to access remote: Could not resolve host".to_string(),
            )),
        }
    }

    fn conflicted_files(&self) -> Result<ConflictSet> {
        self.inner.conflicted_files()
    }
    fn has_remote(&self, name: &str) -> bool {
        self.inner.has_remote(name)
    }
    fn get_remote_url(&self, name: &str) -> Result<String> {
        self.inner.get_remote_url(name)
    }
    fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.inner.add_remote(name, url)
    }
    fn set_remote_url(&self, name: &str, url: &str) -> Result<()> {
        self.inner.set_remote_url(name, url)
    }
    fn config_value(&self, key: &str) -> Option<String> {
        self.inner.config_value(key)
    }
    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set_config(key, value)
    }
}

/// Bind a reconciler to an already opened (possibly wrapped) repository.
pub fn bind(
    config: SyncConfig,
    scm: Box<dyn Scm>,
    resolver: ConflictResolver,
) -> (RepositoryReconciler, MemorySink) {
    let sink = MemorySink::new();
    let reconciler =
        RepositoryReconciler::with_scm(config, scm, resolver, Box::new(sink.clone()));
    (reconciler, sink)
}
