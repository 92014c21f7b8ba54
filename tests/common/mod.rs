//! Shared fixtures for integration tests.
//!
//! Every test gets its own bare "remote" repository seeded with one page,
//! `content/foo/test.md`, on branch `main`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use wikiedit::core::config::StoreSettings;
use wikiedit::store::Store;

/// Initial contents of `content/foo/test.md`.
pub const SEED_PAGE: &str = "# hello\n__world__\n";

/// A bare remote plus a clone used to push commits to it.
pub struct TestRemote {
    root: TempDir,
}

impl TestRemote {
    /// Create the remote with the seed page committed on `main`.
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let remote = root.path().join("remote.git");
        std::fs::create_dir(&remote).unwrap();
        run_git(&remote, &["init", "--quiet", "--bare", "--initial-branch=main"]);

        let this = Self { root };
        let seed = this.seed();
        run_git(this.root.path(), &["clone", "--quiet", path_str(&remote), path_str(&seed)]);
        configure_user(&seed);
        run_git(&seed, &["checkout", "--quiet", "-b", "main"]);

        this.commit_and_push("content/foo/test.md", SEED_PAGE, "initial commit");
        this
    }

    /// Path of the bare repository.
    pub fn url(&self) -> PathBuf {
        self.root.path().join("remote.git")
    }

    /// The clone used for pushing.
    pub fn seed(&self) -> PathBuf {
        self.root.path().join("seed")
    }

    /// A fresh directory for a store working copy.
    pub fn store_dir(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Settings for a store at `store_dir(name)`.
    pub fn settings(&self, name: &str) -> StoreSettings {
        StoreSettings::new(self.store_dir(name))
    }

    /// Bootstrap a store at `store_dir(name)` tracking this remote.
    pub fn store(&self, name: &str) -> Store {
        Store::bootstrap(self.settings(name), Some(path_str(&self.url()))).expect("bootstrap failed")
    }

    /// Commit `contents` at `path` in the seed clone and push it.
    pub fn write_and_push(&self, path: &str, contents: &str, message: &str) {
        run_git(&self.seed(), &["pull", "--quiet", "--rebase", "origin", "main"]);
        self.commit_and_push(path, contents, message);
    }

    fn commit_and_push(&self, path: &str, contents: &str, message: &str) {
        let seed = self.seed();
        let file = seed.join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, contents).unwrap();
        run_git(&seed, &["add", path]);
        run_git(&seed, &["commit", "--quiet", "-m", message]);
        run_git(&seed, &["push", "--quiet", "origin", "main"]);
    }

    /// Clone the remote into a new directory and return its path.
    pub fn fresh_clone(&self, name: &str) -> PathBuf {
        let dir = self.root.path().join(name);
        run_git(self.root.path(), &["clone", "--quiet", path_str(&self.url()), path_str(&dir)]);
        dir
    }

    /// Number of commits on the remote's `main`.
    pub fn commit_count(&self) -> usize {
        count_commits(&self.url())
    }
}

/// Number of commits reachable from HEAD in `repo`.
pub fn count_commits(repo: &Path) -> usize {
    git_stdout(repo, &["rev-list", "--count", "HEAD"])
        .trim()
        .parse()
        .expect("rev-list output")
}

/// Full message of the HEAD commit.
pub fn head_message(repo: &Path) -> String {
    git_stdout(repo, &["log", "-1", "--format=%B"])
}

pub fn configure_user(repo: &Path) {
    run_git(repo, &["config", "user.email", "seed@example.com"]);
    run_git(repo, &["config", "user.name", "Seed"]);
}

/// Run a git command in the given directory, panicking on failure.
pub fn run_git(dir: &Path, args: &[&str]) {
    git_stdout(dir, args);
}

pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("failed to run git");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8(output.stdout).unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}
