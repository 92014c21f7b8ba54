//! git::interface
//!
//! Git interface implementation.
//!
//! This module provides the **single doorway** to all Git operations in
//! wikiedit. Repository state is inspected through `git2`; porcelain
//! operations that must behave exactly like the user's git (fetch, rebase,
//! push, commit) run through the `git` CLI with captured output.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: No repository at the given path
//! - [`GitError::Spawn`]: The `git` executable could not be started
//! - [`GitError::CommandFailed`]: A git command exited non-zero; its
//!   combined output is attached
//! - [`GitError::Internal`]: A `git2` query failed
//!
//! # Example
//!
//! ```ignore
//! use wikiedit::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/srv/wiki"))?;
//! git.fetch("origin", "main")?;
//! if let Some(head) = git.head_oid()? {
//!     println!("HEAD is at {}", head.short(7));
//! }
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::core::config::Committer;
use crate::core::types::{Oid, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// No repository at the given path.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// The git executable could not be run.
    #[error("failed to run {command}: {source}")]
    Spawn {
        /// The command line
        command: String,
        source: std::io::Error,
    },

    /// A git command exited unsuccessfully.
    #[error("{command} failed ({status}): {output}")]
    CommandFailed {
        /// The command line
        command: String,
        /// Exit status description
        status: String,
        /// Combined stdout and stderr
        output: String,
    },

    /// Invalid object id returned by git.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        GitError::InvalidOid {
            oid: err.to_string(),
        }
    }
}

/// State of in-progress Git operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitState {
    /// No operation in progress.
    Clean,
    /// Rebase in progress (typically a conflicted `pull --rebase`).
    Rebase,
    /// Any other operation (merge, cherry-pick, revert, bisect).
    Other,
}

impl GitState {
    /// Check if any operation is in progress.
    ///
    /// ```
    /// use wikiedit::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Rebase.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase => "rebase",
            GitState::Other => "merge or sequencer operation",
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Summary of working tree status for tracked files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// Check if the worktree is completely clean.
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && !self.has_conflicts
    }
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
    /// Committer timestamp
    pub time: chrono::DateTime<chrono::Utc>,
}

/// Runs `git` subcommands in a fixed directory with a fixed identity.
#[derive(Debug, Clone)]
struct Cli {
    work_dir: PathBuf,
    identity: Option<Committer>,
}

impl Cli {
    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let command = format!("git {}", args.join(" "));

        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.work_dir)
            // Never block on a credential prompt; there is nobody to answer it.
            .env("GIT_TERMINAL_PROMPT", "0");

        if let Some(identity) = &self.identity {
            cmd.env("GIT_AUTHOR_NAME", &identity.name)
                .env("GIT_AUTHOR_EMAIL", &identity.email)
                .env("GIT_COMMITTER_NAME", &identity.name)
                .env("GIT_COMMITTER_EMAIL", &identity.email);
        }

        let output = cmd.output().map_err(|source| GitError::Spawn {
            command: command.clone(),
            source,
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command,
                status: output.status.to_string(),
                output: combined.trim().to_string(),
            });
        }

        tracing::trace!(%command, "git command succeeded");
        Ok(combined)
    }
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. No other module
/// imports `git2` or spawns `git`.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
    cli: Cli,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("work_dir", &self.cli.work_dir)
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening
    // =========================================================================

    /// Open the repository whose working directory is exactly `path`.
    ///
    /// Unlike discovery, this never walks up into an enclosing repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` is not a repository root
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        let work_dir = repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();

        Ok(Self {
            repo,
            cli: Cli {
                work_dir,
                identity: None,
            },
        })
    }

    /// Check whether `path` is the root of a repository.
    pub fn exists(path: &Path) -> bool {
        git2::Repository::open(path).is_ok()
    }

    /// Create a new repository at `path` (creating the directory if needed)
    /// and open it.
    pub fn init(path: &Path) -> Result<Self, GitError> {
        std::fs::create_dir_all(path).map_err(|e| GitError::Internal {
            message: format!("cannot create {}: {}", path.display(), e),
        })?;

        let cli = Cli {
            work_dir: path.to_path_buf(),
            identity: None,
        };
        cli.run(&["init", "--quiet"])?;

        Self::open(path)
    }

    /// Use `identity` as author and committer for all subsequent commands.
    pub fn with_identity(mut self, identity: Committer) -> Self {
        self.cli.identity = Some(identity);
        self
    }

    /// The working directory.
    pub fn work_dir(&self) -> &Path {
        &self.cli.work_dir
    }

    // =========================================================================
    // Porcelain
    // =========================================================================

    /// `git remote add <name> <url>`
    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.cli.run(&["remote", "add", name, url]).map(drop)
    }

    /// `git reset --hard`: discard staged and unstaged changes to tracked
    /// files.
    pub fn reset_hard(&self) -> Result<(), GitError> {
        self.cli.run(&["reset", "--hard", "--quiet"]).map(drop)
    }

    /// `git fetch <remote> <branch>`
    pub fn fetch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.cli.run(&["fetch", "--quiet", remote, branch]).map(drop)
    }

    /// `git checkout <branch>`
    pub fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.cli.run(&["checkout", "--quiet", branch]).map(drop)
    }

    /// `git add -- <pathspec>`
    pub fn add(&self, pathspec: &str) -> Result<(), GitError> {
        self.cli.run(&["add", "--", pathspec]).map(drop)
    }

    /// `git commit --allow-empty -m <message>`
    ///
    /// Empty commits are allowed so that every recorded edit attempt leaves
    /// an entry in history, even when the content did not change.
    pub fn commit_allow_empty(&self, message: &str) -> Result<(), GitError> {
        self.cli
            .run(&["commit", "--quiet", "--allow-empty", "-m", message])
            .map(drop)
    }

    /// `git pull --rebase <remote> <branch>`
    pub fn pull_rebase(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.cli
            .run(&["pull", "--rebase", "--quiet", remote, branch])
            .map(drop)
    }

    /// `git push <remote> <branch>`
    pub fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.cli.run(&["push", "--quiet", remote, branch]).map(drop)
    }

    /// `git rebase --abort`
    pub fn rebase_abort(&self) -> Result<(), GitError> {
        self.cli.run(&["rebase", "--abort"]).map(drop)
    }

    // =========================================================================
    // State Detection
    // =========================================================================

    /// Get the current in-progress operation state.
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge
            | git2::RepositoryState::ApplyMailboxOrRebase => GitState::Rebase,
            _ => GitState::Other,
        }
    }

    /// Get working tree status for tracked files.
    pub fn worktree_status(&self) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut result = WorktreeStatus::default();

        for entry in statuses.iter() {
            let status = entry.status();

            if status.is_conflicted() {
                result.has_conflicts = true;
            }
            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }
            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }
        }

        Ok(result)
    }

    /// Get the URL for a remote, or `None` if the remote doesn't exist.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Get the commit HEAD points to, or `None` on an unborn branch.
    pub fn head_oid(&self) -> Result<Option<Oid>, GitError> {
        match self.repo.head() {
            Ok(head) => match head.target() {
                Some(oid) => Ok(Some(Oid::new(oid.to_string())?)),
                None => Ok(None),
            },
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The most recent `limit` commits reachable from HEAD, newest first.
    pub fn recent_commits(&self, limit: usize) -> Result<Vec<CommitInfo>, GitError> {
        if self.head_oid()?.is_none() {
            return Ok(Vec::new());
        }

        let mut walk = self.repo.revwalk()?;
        walk.push_head()?;

        let mut commits = Vec::new();
        for oid in walk.take(limit) {
            let commit = self.repo.find_commit(oid?)?;
            let time = chrono::DateTime::from_timestamp(commit.time().seconds(), 0)
                .unwrap_or(chrono::DateTime::UNIX_EPOCH);

            commits.push(CommitInfo {
                oid: Oid::new(commit.id().to_string())?,
                summary: commit.summary().unwrap_or("").to_string(),
                time,
            });
        }

        Ok(commits)
    }
}
