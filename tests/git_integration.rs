//! Integration tests for the Git interface and inspector.
//!
//! These tests use real git repositories created via tempfile to verify
//! that VCS facts are read the way the git CLI reports them.

use std::path::Path;
use std::process::Command;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use gozer::git::{Git, GitError, GitInspector, VcsInspector};

/// Test fixture that creates a real git repository.
struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new test repository with an initial commit.
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");

        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "tag.gpgsign", "false"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);

        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        run_git(dir.path(), &["add", "Dockerfile"]);
        run_git(dir.path(), &["commit", "-m", "Initial commit"]);

        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    fn commit_file(&self, path: &str, content: &str, message: &str) {
        std::fs::write(self.path().join(path), content).unwrap();
        run_git(self.path(), &["add", path]);
        run_git(self.path(), &["commit", "-m", message]);
    }

    fn add_remote(&self, name: &str, url: &str) {
        run_git(self.path(), &["remote", "add", name, url]);
    }

    fn annotated_tag(&self, name: &str, message: &str) {
        run_git(self.path(), &["tag", "-a", name, "-m", message]);
    }

    fn lightweight_tag(&self, name: &str) {
        run_git(self.path(), &["tag", name]);
    }

    /// Abbreviated HEAD id as reported by the git CLI.
    fn short_head_raw(&self) -> String {
        git_stdout(self.path(), &["rev-parse", "--short", "HEAD"])
    }

    fn head_raw(&self) -> String {
        git_stdout(self.path(), &["rev-parse", "HEAD"])
    }
}

/// Run a git command in the given directory.
fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

// =============================================================================
// Repository Opening Tests
// =============================================================================

#[test]
fn open_from_subdirectory() {
    let repo = TestRepo::new();
    let subdir = repo.path().join("subdir");
    std::fs::create_dir(&subdir).unwrap();

    assert!(Git::open(&subdir).is_ok());
}

#[test]
fn open_non_repository_fails() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Git::open(dir.path()),
        Err(GitError::NotARepo { .. })
    ));
}

#[test]
fn open_bare_repository_fails() {
    let dir = TempDir::new().unwrap();
    run_git(dir.path(), &["init", "--bare"]);
    assert!(matches!(Git::open(dir.path()), Err(GitError::BareRepo)));
}

#[test]
fn empty_repository_has_no_head() {
    let dir = TempDir::new().unwrap();
    run_git(dir.path(), &["init"]);
    let git = Git::open(dir.path()).unwrap();
    assert!(matches!(git.short_head(), Err(GitError::NoHead)));
}

// =============================================================================
// HEAD and Tags
// =============================================================================

#[test]
fn short_head_matches_git_cli() {
    let repo = TestRepo::new();
    let git = repo.git();

    assert_eq!(git.head_id().unwrap(), repo.head_raw());
    let short = git.short_head().unwrap();
    assert_eq!(short, repo.short_head_raw());
    assert!(repo.head_raw().starts_with(&short));
}

#[test]
fn short_head_follows_new_commits() {
    let repo = TestRepo::new();
    let before = repo.git().short_head().unwrap();

    repo.commit_file("app.txt", "hello\n", "Add app");

    let after = repo.git().short_head().unwrap();
    assert_ne!(before, after);
    assert_eq!(after, repo.short_head_raw());
}

#[test]
fn no_tags_at_head() {
    let repo = TestRepo::new();
    assert!(repo.git().tags_at_head().unwrap().is_empty());
}

#[test]
fn tags_at_head_with_annotations() {
    let repo = TestRepo::new();
    repo.annotated_tag("v1.0.0", "First release\n\nLonger body text");
    repo.lightweight_tag("stable");

    let mut tags = repo.git().tags_at_head().unwrap();
    tags.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].name, "stable");
    assert_eq!(tags[0].annotation, None);
    assert_eq!(tags[1].name, "v1.0.0");
    assert_eq!(tags[1].annotation.as_deref(), Some("First release"));
}

#[test]
fn tags_on_older_commits_are_ignored() {
    let repo = TestRepo::new();
    repo.annotated_tag("v0.1.0", "Old release");
    repo.commit_file("app.txt", "hello\n", "Add app");

    assert!(repo.git().tags_at_head().unwrap().is_empty());
}

// =============================================================================
// Remotes
// =============================================================================

#[test]
fn no_remote() {
    let repo = TestRepo::new();
    assert_eq!(repo.git().origin_url().unwrap(), None);
}

#[test]
fn origin_preferred_over_other_remotes() {
    let repo = TestRepo::new();
    repo.add_remote("aaa", "https://example.com/team/other.git");
    repo.add_remote("origin", "git@github.com:team/webapp.git");

    assert_eq!(
        repo.git().origin_url().unwrap().as_deref(),
        Some("git@github.com:team/webapp.git")
    );
}

#[test]
fn first_remote_used_without_origin() {
    let repo = TestRepo::new();
    repo.add_remote("upstream", "https://example.com/team/service.git");

    assert_eq!(
        repo.git().origin_url().unwrap().as_deref(),
        Some("https://example.com/team/service.git")
    );
}

// =============================================================================
// Inspector
// =============================================================================

#[test]
fn inspector_describes_working_copy() {
    let repo = TestRepo::new();
    repo.add_remote("origin", "https://github.com/team/WebApp.git");
    repo.lightweight_tag("a-light");
    repo.annotated_tag("b-release", "Release notes");

    let inspector = GitInspector::new(repo.path());
    let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
    let meta = inspector.describe(now).unwrap();

    assert_eq!(meta.commit, repo.short_head_raw());
    assert_eq!(meta.origin, "https://github.com/team/WebApp.git");
    assert_eq!(meta.created_at, "2024-05-06T07:08:09Z");
    assert_eq!(meta.tags.len(), 2);
    assert!(meta.tags.contains(&"a-light".to_string()));
    assert!(meta.tags.contains(&"b-release".to_string()));

    let release = meta.tags.iter().position(|t| t == "b-release").unwrap();
    assert_eq!(meta.annotation_for(release), Some("Release notes"));

    assert_eq!(inspector.repo_name().unwrap(), "webapp");
}

#[test]
fn inspector_without_remote() {
    let repo = TestRepo::new();
    let inspector = GitInspector::new(repo.path());

    let meta = inspector.describe(Utc::now()).unwrap();
    assert_eq!(meta.origin, "");
    assert!(meta.tags.is_empty());
    assert!(meta.annotations.is_empty());

    assert!(matches!(inspector.repo_name(), Err(GitError::NoRemote)));
}

#[test]
fn inspector_outside_repository() {
    let dir = TempDir::new().unwrap();
    let inspector = GitInspector::new(dir.path());
    assert!(matches!(
        inspector.describe(Utc::now()),
        Err(GitError::NotARepo { .. })
    ));
}
