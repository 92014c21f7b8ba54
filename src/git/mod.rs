//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All repository reads and writes
//! flow through this interface. No other module imports `git2` or spawns the
//! `git` executable.
//!
//! # Responsibilities
//!
//! - Repository creation and opening
//! - Porcelain operations: reset, fetch, checkout, add, commit, pull, push
//! - State detection (in-progress rebase, worktree status)
//! - History queries (HEAD, recent commits, remotes)
//!
//! # Invariants
//!
//! - Every command runs to completion; there is no mid-command cancellation
//! - A failed command reports its combined output
//! - Commands never prompt for credentials

mod interface;

pub use interface::{CommitInfo, Git, GitError, GitState, WorktreeStatus};
