//! core
//!
//! Core domain types and rules for wikiedit.
//!
//! # Modules
//!
//! - [`types`] - Strong types: PagePath, BranchName, Oid, Author
//! - [`frontmatter`] - Frontmatter parsing and the merge policy
//! - [`paths`] - Document location routing inside the store
//! - [`config`] - Configuration schema, loading, and resolution
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Nothing in `core` touches git or the network

pub mod config;
pub mod frontmatter;
pub mod paths;
pub mod types;
