//! GitScm against real repositories and a local bare remote.
//!
//! Every test skips itself when the `git` binary is not installed.

mod common;

use common::{git, git_available, TestRemote};
use rstest::rstest;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use git_autosync::conflict::ConflictKind;
use git_autosync::scm::{self, IntegrationStatus, PushStatus, Scm};

fn working_copy(dir: &Path) -> Box<dyn Scm> {
    let repo = scm::init(dir).unwrap();
    scm::ensure_identity(repo.as_ref(), "Test User", "test@example.com").unwrap();
    if repo.current_branch().unwrap() != "main" {
        repo.create_branch("main", None).unwrap();
    }
    repo
}

fn commit_file(repo: &dyn Scm, name: &str, content: &str) {
    fs::write(repo.workdir().join(name), content).unwrap();
    repo.stage_all().unwrap();
    repo.commit(&format!("write {name}"), false).unwrap();
}

// =============================================================================
// Repository Lifecycle Tests
// =============================================================================

#[test]
fn test_open_after_init() {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let temp = TempDir::new().unwrap();
    let _repo = scm::init(temp.path()).unwrap();

    assert!(scm::is_repo(temp.path()));
    assert!(scm::open(temp.path()).is_ok(), "Failed to reopen repository");
}

#[test]
fn test_clone_checks_out_branch() {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let remote = TestRemote::new();
    let seed = working_copy(&remote.temp.path().join("seed"));
    commit_file(seed.as_ref(), "a.txt", "a\n");
    seed.add_remote("origin", &remote.url()).unwrap();
    assert_eq!(seed.push("origin", "main", false).unwrap(), PushStatus::Pushed);

    let target = remote.temp.path().join("clone");
    let clone = scm::clone(&remote.url(), &target, Some("main")).unwrap();

    assert_eq!(clone.current_branch().unwrap(), "main");
    assert!(target.join("a.txt").exists());
    assert!(clone.ref_exists("origin/main"));
}

#[test]
fn test_clone_of_missing_branch_fails() {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let remote = TestRemote::new();
    let target = remote.temp.path().join("clone");
    assert!(scm::clone(&remote.url(), &target, Some("main")).is_err());
}

// =============================================================================
// Staging Tests
// =============================================================================

#[rstest]
#[case::new_file("new.txt", None)]
#[case::modified("tracked.txt", Some("changed\n"))]
fn test_changes_are_counted(#[case] file: &str, #[case] content: Option<&str>) {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let temp = TempDir::new().unwrap();
    let repo = working_copy(temp.path());
    commit_file(repo.as_ref(), "tracked.txt", "original\n");
    assert!(!repo.has_changes().unwrap());

    fs::write(temp.path().join(file), content.unwrap_or("fresh\n")).unwrap();
    assert!(repo.has_changes().unwrap());

    repo.stage_all().unwrap();
    assert_eq!(repo.staged_file_count().unwrap(), 1);
}

#[test]
fn test_deletion_is_staged() {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let temp = TempDir::new().unwrap();
    let repo = working_copy(temp.path());
    commit_file(repo.as_ref(), "doomed.txt", "x\n");

    fs::remove_file(temp.path().join("doomed.txt")).unwrap();
    repo.stage_path("doomed.txt").unwrap();
    assert_eq!(repo.staged_file_count().unwrap(), 1);
    repo.commit("remove doomed.txt", false).unwrap();
    assert!(!repo.has_changes().unwrap());
}

// =============================================================================
// Integration Tests
// =============================================================================

#[test]
fn test_both_added_conflict_kind() {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let temp = TempDir::new().unwrap();
    let repo = working_copy(temp.path());
    commit_file(repo.as_ref(), "base.txt", "base\n");

    repo.create_branch("other", None).unwrap();
    commit_file(repo.as_ref(), "new.txt", "theirs\n");
    repo.checkout("main").unwrap();
    commit_file(repo.as_ref(), "new.txt", "ours\n");

    let status = repo.merge("other", "merge other", false).unwrap();
    assert_eq!(status, IntegrationStatus::Conflicted);

    let conflicts = repo.conflicted_files().unwrap();
    assert_eq!(conflicts.len(), 1);
    let entry = conflicts.iter().next().unwrap();
    assert_eq!(entry.path, "new.txt");
    assert_eq!(entry.kind, ConflictKind::BothAdded);

    repo.merge_abort().unwrap();
}

#[test]
fn test_unrelated_histories_detected() {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let temp = TempDir::new().unwrap();
    let repo = working_copy(&temp.path().join("one"));
    commit_file(repo.as_ref(), "one.txt", "1\n");

    let other = working_copy(&temp.path().join("two"));
    commit_file(other.as_ref(), "two.txt", "2\n");

    let other_path = other.workdir().to_string_lossy().to_string();
    repo.add_remote("other", &other_path).unwrap();
    repo.fetch("other").unwrap();

    let status = repo.merge("other/main", "unify", false).unwrap();
    assert!(matches!(status, IntegrationStatus::UnrelatedHistories(_)));

    let status = repo.merge("other/main", "unify", true).unwrap();
    assert_eq!(status, IntegrationStatus::Integrated);
    assert!(temp.path().join("one").join("two.txt").exists());
}

#[test]
fn test_rebase_conflict_then_continue() {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let temp = TempDir::new().unwrap();
    let repo = working_copy(temp.path());
    commit_file(repo.as_ref(), "shared.txt", "base\n");

    repo.create_branch("upstream", None).unwrap();
    commit_file(repo.as_ref(), "shared.txt", "upstream\n");
    repo.checkout("main").unwrap();
    commit_file(repo.as_ref(), "shared.txt", "local\n");

    assert_eq!(repo.rebase("upstream").unwrap(), IntegrationStatus::Conflicted);
    assert_eq!(repo.conflicted_files().unwrap().paths(), vec!["shared.txt"]);

    fs::write(temp.path().join("shared.txt"), "both\n").unwrap();
    repo.stage_path("shared.txt").unwrap();
    assert_eq!(repo.rebase_continue().unwrap(), IntegrationStatus::Integrated);

    assert_eq!(repo.current_branch().unwrap(), "main");
    assert!(repo.is_ancestor("upstream", "HEAD").unwrap());
}

#[test]
fn test_rebase_continue_skips_emptied_commit() {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let temp = TempDir::new().unwrap();
    let repo = working_copy(temp.path());
    commit_file(repo.as_ref(), "shared.txt", "base\n");

    repo.create_branch("upstream", None).unwrap();
    commit_file(repo.as_ref(), "shared.txt", "upstream\n");
    repo.checkout("main").unwrap();
    commit_file(repo.as_ref(), "shared.txt", "local\n");

    assert_eq!(repo.rebase("upstream").unwrap(), IntegrationStatus::Conflicted);

    // Keep the upstream side: the replayed commit no longer changes anything.
    fs::write(temp.path().join("shared.txt"), "upstream\n").unwrap();
    repo.stage_path("shared.txt").unwrap();
    assert_eq!(repo.rebase_continue().unwrap(), IntegrationStatus::Integrated);

    assert_eq!(repo.resolve_ref("HEAD").unwrap(), repo.resolve_ref("upstream").unwrap());
}

// =============================================================================
// Push Tests
// =============================================================================

#[rstest]
#[case::plain(false)]
#[case::forced(true)]
fn test_first_push_sets_upstream(#[case] force: bool) {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let remote = TestRemote::new();
    let repo = working_copy(&remote.temp.path().join("work"));
    commit_file(repo.as_ref(), "a.txt", "a\n");
    repo.add_remote("origin", &remote.url()).unwrap();

    assert_eq!(repo.push("origin", "main", force).unwrap(), PushStatus::Pushed);
    assert_eq!(remote.tip("main"), repo.resolve_ref("HEAD").unwrap());
    assert_eq!(
        git(repo.workdir(), &["rev-parse", "--abbrev-ref", "main@{upstream}"]),
        "origin/main"
    );
}

#[test]
fn test_push_behind_remote_is_rejected() {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let remote = TestRemote::new();
    let first = working_copy(&remote.temp.path().join("first"));
    commit_file(first.as_ref(), "a.txt", "a\n");
    first.add_remote("origin", &remote.url()).unwrap();
    first.push("origin", "main", false).unwrap();

    let second = scm::clone(&remote.url(), &remote.temp.path().join("second"), Some("main")).unwrap();
    scm::ensure_identity(second.as_ref(), "Test User", "test@example.com").unwrap();
    commit_file(second.as_ref(), "b.txt", "b\n");
    second.push("origin", "main", false).unwrap();

    commit_file(first.as_ref(), "c.txt", "c\n");
    let status = first.push("origin", "main", false).unwrap();
    assert!(matches!(status, PushStatus::Rejected(_)), "{status:?}");

    assert_eq!(first.push("origin", "main", true).unwrap(), PushStatus::Pushed);
    assert_eq!(remote.tip("main"), first.resolve_ref("HEAD").unwrap());
}

#[test]
fn test_push_to_missing_remote_fails() {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let temp = TempDir::new().unwrap();
    let repo = working_copy(&temp.path().join("work"));
    commit_file(repo.as_ref(), "a.txt", "a\n");
    let missing = temp.path().join("nowhere.git").to_string_lossy().to_string();
    repo.add_remote("origin", &missing).unwrap();

    assert!(repo.fetch("origin").is_err());
    assert!(matches!(
        repo.push("origin", "main", false).unwrap(),
        PushStatus::Failed(_)
    ));
}
