//! Architecture enforcement tests.
//!
//! Layering rules that the compiler cannot check are enforced here by
//! scanning the source tree, so violations fail CI.
//!
//! # Rules
//!
//! 1. **Git doorway** - only `src/git/` may use `git2` or spawn processes
//! 2. **Markup isolation** - only `src/markup/` may use `pulldown_cmark`
//! 3. **Lock encapsulation** - only `src/store/` may name the workspace lock
//! 4. **HTTP at the edge** - `axum` stays in `src/server/` (and the CLI
//!    that starts it)

use std::fs;
use std::path::{Path, PathBuf};

/// Collect every `.rs` file under `dir`.
fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir).unwrap_or_else(|e| panic!("read {}: {e}", dir.display()));
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    files
}

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

/// Files outside `allowed` (relative to `src/`) that contain `needle`.
fn violations(needle: &str, allowed: &[&str]) -> Vec<String> {
    let src = src_dir();
    rust_files(&src)
        .into_iter()
        .filter(|path| {
            let rel = path.strip_prefix(&src).unwrap();
            !allowed.iter().any(|prefix| rel.starts_with(prefix))
        })
        .filter(|path| fs::read_to_string(path).unwrap().contains(needle))
        .map(|path| path.strip_prefix(&src).unwrap().display().to_string())
        .collect()
}

#[test]
fn source_tree_is_scanned() {
    let files = rust_files(&src_dir());
    assert!(files.iter().any(|p| p.ends_with("git/interface.rs")));
    assert!(files.iter().any(|p| p.ends_with("store/mutator.rs")));
}

#[test]
fn only_git_module_uses_git2() {
    let found = violations("git2::", &["git"]);
    assert!(found.is_empty(), "git2 used outside src/git: {found:?}");
}

#[test]
fn only_git_module_spawns_processes() {
    let found = violations("std::process::Command", &["git"]);
    assert!(found.is_empty(), "process spawned outside src/git: {found:?}");

    let found = violations("Command::new(", &["git"]);
    assert!(found.is_empty(), "process spawned outside src/git: {found:?}");
}

#[test]
fn only_markup_module_uses_pulldown_cmark() {
    let found = violations("pulldown_cmark", &["markup"]);
    assert!(found.is_empty(), "pulldown_cmark used outside src/markup: {found:?}");
}

#[test]
fn workspace_lock_stays_in_store() {
    let found = violations("workspace.lock()", &["store"]);
    assert!(found.is_empty(), "store lock taken outside src/store: {found:?}");

    let found = violations("parking_lot", &["store"]);
    assert!(found.is_empty(), "parking_lot used outside src/store: {found:?}");
}

#[test]
fn axum_stays_at_the_edge() {
    let found = violations("axum", &["server", "cli", "main.rs"]);
    assert!(found.is_empty(), "axum used outside the HTTP layer: {found:?}");
}
