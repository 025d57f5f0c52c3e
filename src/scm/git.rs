//! Git SCM backend using CLI commands.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::{IntegrationStatus, PushStatus, Scm};
use crate::conflict::ConflictSet;

/// Git SCM implementation using the git CLI.
pub struct GitScm {
    workdir: PathBuf,
}

impl GitScm {
    /// Open an existing Git repository.
    pub fn open(path: &Path) -> Result<Self> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if !path.join(".git").exists() {
            return Err(anyhow!(
                "Not a git repository: '{}' (no .git directory)",
                path.display()
            ));
        }

        Ok(Self { workdir: path })
    }

    /// Initialize a new Git repository.
    pub fn init(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory '{}'", path.display()))?;

        let output = git_command()
            .args(["init"])
            .current_dir(path)
            .output()
            .context("Failed to run 'git init'")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git init failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Self::open(path)
    }

    /// Clone a remote repository.
    pub fn clone(url: &str, path: &Path, branch: Option<&str>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory for '{}'", path.display())
            })?;
        }

        let path_arg = path.to_string_lossy();
        let mut args = vec!["clone"];
        if let Some(branch) = branch {
            args.extend(["--branch", branch]);
        }
        args.extend([url, &*path_arg]);

        let output = git_command()
            .args(&args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .context("Failed to run 'git clone'")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git clone failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Self::open(path)
    }

    /// Build a git command rooted at the working tree. `GIT_EDITOR=true`
    /// keeps merge and rebase continuation from opening an editor.
    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = git_command();
        cmd.args(args)
            .current_dir(&self.workdir)
            .env("GIT_EDITOR", "true")
            .env("GIT_MERGE_AUTOEDIT", "no");
        cmd
    }

    /// Run a git command and return its raw output, whatever the exit code.
    fn output(&self, args: &[&str]) -> Result<Output> {
        self.command(args)
            .output()
            .with_context(|| format!("Failed to run 'git {}'", args.join(" ")))
    }

    /// Run a git command and return stdout as a string.
    fn run_git(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;

        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run a git command, returning Ok if it succeeds (ignoring stdout).
    fn run_git_ok(&self, args: &[&str]) -> Result<()> {
        self.run_git(args)?;
        Ok(())
    }

    /// Check if a git command succeeds (exit code 0).
    fn git_succeeds(&self, args: &[&str]) -> bool {
        self.command(args)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Classify the output of a merge, rebase or rebase continuation.
    fn classify_integration(&self, output: &Output) -> Result<IntegrationStatus> {
        if output.status.success() {
            return Ok(IntegrationStatus::Integrated);
        }

        let text = combined_output(output);
        if text.contains("unrelated histories") {
            return Ok(IntegrationStatus::UnrelatedHistories(text));
        }
        if text.contains("CONFLICT") || !self.conflicted_files()?.is_empty() {
            return Ok(IntegrationStatus::Conflicted);
        }
        Ok(IntegrationStatus::Failed(text))
    }
}

/// `git` with untranslated messages. Failures are classified by matching
/// git's output, which must not depend on the user's locale.
fn git_command() -> Command {
    let mut cmd = Command::new("git");
    cmd.env("LC_ALL", "C").env("LANGUAGE", "C");
    cmd
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}\n{}", stdout.trim(), stderr.trim())
        .trim()
        .to_string()
}

impl Scm for GitScm {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn git_dir(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(self.run_git(&["rev-parse", "--absolute-git-dir"])?))
    }

    fn current_branch(&self) -> Result<String> {
        self.run_git(&["branch", "--show-current"])
    }

    fn local_branches(&self) -> Result<Vec<String>> {
        let output = self.run_git(&["for-each-ref", "--format=%(refname:short)", "refs/heads"])?;
        Ok(output
            .lines()
            .filter(|l| !l.is_empty())
            .map(|s| s.to_string())
            .collect())
    }

    fn has_commits(&self) -> bool {
        self.ref_exists("HEAD")
    }

    fn ref_exists(&self, refname: &str) -> bool {
        let spec = format!("{refname}^{{commit}}");
        self.git_succeeds(&["rev-parse", "--verify", "--quiet", &spec])
    }

    fn resolve_ref(&self, refname: &str) -> Result<String> {
        let spec = format!("{refname}^{{commit}}");
        self.run_git(&["rev-parse", "--verify", &spec])
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let output = self.output(&["merge-base", "--is-ancestor", ancestor, descendant])?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(anyhow!(
                "git merge-base --is-ancestor failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )),
        }
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.run_git_ok(&["checkout", branch])
    }

    fn create_branch(&self, branch: &str, upstream: Option<&str>) -> Result<()> {
        match upstream {
            Some(upstream) => self.run_git_ok(&["checkout", "-b", branch, "--track", upstream]),
            None => self.run_git_ok(&["checkout", "-b", branch]),
        }
    }

    fn stage_all(&self) -> Result<()> {
        self.run_git_ok(&["add", "-A"])
    }

    fn stage_path(&self, path: &str) -> Result<()> {
        self.run_git_ok(&["add", "-A", "--", path])
    }

    fn has_changes(&self) -> Result<bool> {
        let output = self.run_git(&["status", "--porcelain"])?;
        Ok(!output.is_empty())
    }

    fn staged_file_count(&self) -> Result<usize> {
        let output = self.output(&["diff", "--cached", "--name-only", "-z"])?;
        if !output.status.success() {
            return Err(anyhow!(
                "git diff --cached failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .split('\0')
            .filter(|p| !p.is_empty())
            .count())
    }

    fn commit(&self, message: &str, allow_empty: bool) -> Result<()> {
        if allow_empty {
            self.run_git_ok(&["commit", "--allow-empty", "-m", message])
        } else {
            self.run_git_ok(&["commit", "-m", message])
        }
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        let output = self
            .command(&["fetch", remote])
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .context("Failed to run 'git fetch'")?;

        if !output.status.success() {
            return Err(anyhow!(
                "Failed to fetch from remote '{}': {}",
                remote,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(())
    }

    fn merge(
        &self,
        target: &str,
        message: &str,
        allow_unrelated: bool,
    ) -> Result<IntegrationStatus> {
        let mut args = vec!["merge", "--no-edit", "-m", message];
        if allow_unrelated {
            args.push("--allow-unrelated-histories");
        }
        args.push(target);

        let output = self.output(&args)?;
        self.classify_integration(&output)
    }

    fn merge_abort(&self) -> Result<()> {
        self.run_git_ok(&["merge", "--abort"])
    }

    fn rebase(&self, upstream: &str) -> Result<IntegrationStatus> {
        let output = self.output(&["rebase", upstream])?;
        self.classify_integration(&output)
    }

    fn rebase_continue(&self) -> Result<IntegrationStatus> {
        let output = self.output(&["rebase", "--continue"])?;
        if output.status.success() {
            return Ok(IntegrationStatus::Integrated);
        }

        // A resolution that reproduces the upstream content leaves the
        // replayed commit empty; git wants it skipped rather than continued.
        let text = combined_output(&output);
        if text.contains("No changes") || text.contains("nothing to commit") {
            log::debug!("Rebase step became empty after resolution, skipping it");
            let skipped = self.output(&["rebase", "--skip"])?;
            return self.classify_integration(&skipped);
        }

        self.classify_integration(&output)
    }

    fn rebase_abort(&self) -> Result<()> {
        self.run_git_ok(&["rebase", "--abort"])
    }

    fn push(&self, remote: &str, branch: &str, force: bool) -> Result<PushStatus> {
        let mut args = vec!["push", "-u"];
        if force {
            args.push("--force");
        }
        args.extend([remote, branch]);

        let output = self
            .command(&args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .context("Failed to run 'git push'")?;

        if output.status.success() {
            return Ok(PushStatus::Pushed);
        }

        let text = combined_output(&output);
        if text.contains("[rejected]") || text.contains("non-fast-forward") || text.contains("fetch first")
        {
            Ok(PushStatus::Rejected(text))
        } else {
            Ok(PushStatus::Failed(text))
        }
    }

    fn conflicted_files(&self) -> Result<ConflictSet> {
        // Raw stdout: trimming would eat the leading space of a status code.
        let output = self.output(&["status", "--porcelain=v1", "-z"])?;
        if !output.status.success() {
            return Err(anyhow!(
                "git status failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(ConflictSet::from_porcelain_z(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    fn has_remote(&self, name: &str) -> bool {
        self.git_succeeds(&["remote", "get-url", name])
    }

    fn get_remote_url(&self, name: &str) -> Result<String> {
        self.run_git(&["remote", "get-url", name])
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.run_git_ok(&["remote", "add", name, url])
    }

    fn set_remote_url(&self, name: &str, url: &str) -> Result<()> {
        self.run_git_ok(&["remote", "set-url", name, url])
    }

    fn config_value(&self, key: &str) -> Option<String> {
        self.run_git(&["config", "--get", key])
            .ok()
            .filter(|v| !v.is_empty())
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.run_git_ok(&["config", key, value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_repo(temp: &TempDir) -> GitScm {
        let scm = GitScm::init(temp.path()).unwrap();
        scm.set_config("user.name", "Test User").unwrap();
        scm.set_config("user.email", "test@example.com").unwrap();
        scm
    }

    #[test]
    fn test_git_init_and_open() {
        if !crate::scm::is_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let scm = GitScm::init(temp.path()).unwrap();

        assert!(temp.path().join(".git").exists());
        assert_eq!(scm.workdir(), temp.path().canonicalize().unwrap());
        assert!(!scm.has_commits());
        assert!(scm.git_dir().unwrap().ends_with(".git"));
    }

    #[test]
    fn test_git_stage_commit() {
        if !crate::scm::is_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let scm = test_repo(&temp);

        assert!(!scm.has_changes().unwrap());

        std::fs::write(temp.path().join("test.txt"), "hello").unwrap();
        std::fs::write(temp.path().join("other.txt"), "world").unwrap();
        assert!(scm.has_changes().unwrap());

        scm.stage_all().unwrap();
        assert_eq!(scm.staged_file_count().unwrap(), 2);
        scm.commit("Initial commit", false).unwrap();
        assert!(!scm.has_changes().unwrap());
        assert_eq!(scm.staged_file_count().unwrap(), 0);

        let hash = scm.resolve_ref("HEAD").unwrap();
        assert_eq!(hash.len(), 40);
        assert!(scm.has_commits());
    }

    #[test]
    fn test_empty_commit_requires_flag() {
        if !crate::scm::is_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let scm = test_repo(&temp);

        assert!(scm.commit("nothing", false).is_err());
        scm.commit("nothing", true).unwrap();
        assert!(scm.has_commits());
    }

    #[test]
    fn test_branches_and_ancestry() {
        if !crate::scm::is_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let scm = test_repo(&temp);

        if scm.current_branch().unwrap() != "main" {
            scm.create_branch("main", None).unwrap();
        }
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();
        scm.stage_all().unwrap();
        scm.commit("first", false).unwrap();
        let first = scm.resolve_ref("HEAD").unwrap();

        scm.create_branch("feature", None).unwrap();
        std::fs::write(temp.path().join("b.txt"), "b").unwrap();
        scm.stage_all().unwrap();
        scm.commit("second", false).unwrap();

        assert_eq!(scm.current_branch().unwrap(), "feature");
        let mut branches = scm.local_branches().unwrap();
        branches.sort();
        assert_eq!(branches, vec!["feature", "main"]);

        assert!(scm.is_ancestor(&first, "HEAD").unwrap());
        assert!(!scm.is_ancestor("HEAD", &first).unwrap());

        scm.checkout("main").unwrap();
        assert_eq!(scm.current_branch().unwrap(), "main");
        assert!(scm.ref_exists("feature"));
        assert!(!scm.ref_exists("origin/main"));
    }

    #[test]
    fn test_merge_conflict_is_reported() {
        if !crate::scm::is_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let scm = test_repo(&temp);

        if scm.current_branch().unwrap() != "main" {
            scm.create_branch("main", None).unwrap();
        }
        std::fs::write(temp.path().join("shared.txt"), "base\n").unwrap();
        scm.stage_all().unwrap();
        scm.commit("base", false).unwrap();

        scm.create_branch("other", None).unwrap();
        std::fs::write(temp.path().join("shared.txt"), "theirs\n").unwrap();
        scm.stage_all().unwrap();
        scm.commit("theirs", false).unwrap();

        scm.checkout("main").unwrap();
        std::fs::write(temp.path().join("shared.txt"), "ours\n").unwrap();
        scm.stage_all().unwrap();
        scm.commit("ours", false).unwrap();

        let status = scm.merge("other", "merge other", false).unwrap();
        assert_eq!(status, IntegrationStatus::Conflicted);
        assert_eq!(scm.conflicted_files().unwrap().paths(), vec!["shared.txt"]);

        scm.merge_abort().unwrap();
        assert!(scm.conflicted_files().unwrap().is_empty());
    }

    #[test]
    fn test_commands_run_untranslated() {
        let temp = TempDir::new().unwrap();
        let scm = GitScm {
            workdir: temp.path().to_path_buf(),
        };
        let cmd = scm.command(&["status"]);
        let envs: Vec<_> = cmd
            .get_envs()
            .map(|(k, v)| (k.to_os_string(), v.map(|v| v.to_os_string())))
            .collect();

        for (key, value) in [("LC_ALL", "C"), ("LANGUAGE", "C"), ("GIT_EDITOR", "true")] {
            assert!(
                envs.contains(&(key.into(), Some(value.into()))),
                "{key} not set to {value}"
            );
        }
    }

    #[test]
    fn test_git_remote() {
        if !crate::scm::is_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let scm = GitScm::init(temp.path()).unwrap();

        assert!(!scm.has_remote("origin"));

        scm.add_remote("origin", "https://github.com/test/repo.git").unwrap();
        assert!(scm.has_remote("origin"));
        assert!(!scm.has_remote("upstream"));

        scm.set_remote_url("origin", "https://github.com/test/other.git").unwrap();
        assert_eq!(
            scm.get_remote_url("origin").unwrap(),
            "https://github.com/test/other.git"
        );
    }
}
