//! wikiedit - a web editor for git-backed Markdown wikis
//!
//! Authenticated users edit Markdown pages stored in a git repository
//! through a web form. Every save is committed locally; a background task
//! keeps the local clone in step with its remote.
//!
//! # Architecture
//!
//! - [`cli`] - Flags, logging, startup
//! - [`server`] - HTTP routes and the editor page
//! - [`sync`] - Background reconciliation with the remote
//! - [`store`] - Serialized reads and writes against the working copy
//! - [`markup`] - Markdown ↔ HTML conversion
//! - [`git`] - Single interface for all Git operations
//! - [`core`] - Domain types, configuration, frontmatter, path routing
//!
//! # Correctness Invariants
//!
//! 1. All access to the working copy is serialized by one lock
//! 2. Frontmatter on disk is never altered by an edit
//! 3. Edits never create documents
//! 4. A failed edit or sync never leaves the working copy mid-operation

pub mod cli;
pub mod core;
pub mod git;
pub mod markup;
pub mod server;
pub mod store;
pub mod sync;
