//! store::mutator
//!
//! Write path: convert submitted markup, merge frontmatter, write, commit.

use std::fs;
use std::path::Path;

use super::{Store, StoreError, Workspace};
use crate::core::frontmatter;
use crate::core::types::{Author, PagePath};

impl Store {
    /// Replace the body of `path` with `html` and commit the result.
    ///
    /// The commit message is `Update <path>\nAuthored by: <author>\n`, with
    /// the author rendered under the configured attribution posture. A
    /// commit is recorded even when the content is unchanged.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Conversion`] if `html` cannot be converted; nothing
    ///   is touched
    /// - [`StoreError::DocumentNotFound`] if the page has no document
    /// - [`StoreError::EmptyBody`] if the edit leaves no body
    /// - [`StoreError::Io`] / [`StoreError::Git`] if writing or committing
    ///   fails; the working copy is reset to HEAD
    pub fn stage(&self, path: &PagePath, html: &str, author: &Author) -> Result<(), StoreError> {
        let markdown = self.converter.convert(html)?;

        let ws = self.workspace.lock();
        let file = ws.paths.document_path(path);

        let current = match fs::read_to_string(&file) {
            Ok(current) => current,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::DocumentNotFound { path: path.clone() });
            }
            Err(source) => return Err(StoreError::Io { path: file, source }),
        };

        let merged = frontmatter::merge(&current, &markdown);
        if frontmatter::strip(&merged).trim().is_empty() {
            return Err(StoreError::EmptyBody { path: path.clone() });
        }

        write_atomic(&file, &ws.paths.staging_path(path), &merged)?;

        let attribution = author.attribute(ws.settings.attribution);
        let message = format!("Update {path}\nAuthored by: {attribution}\n");

        if let Err(err) = commit(&ws, path, &message) {
            tracing::warn!(page = %path, error = %err, "commit failed, resetting working copy");
            if let Err(reset_err) = ws.git.reset_hard() {
                tracing::error!(error = %reset_err, "reset after failed commit also failed");
            }
            return Err(err);
        }

        tracing::info!(page = %path, author = %attribution, "staged edit");
        Ok(())
    }
}

fn commit(ws: &Workspace, path: &PagePath, message: &str) -> Result<(), StoreError> {
    ws.git.add(&ws.paths.document_pathspec(path))?;
    ws.git.commit_allow_empty(message)?;
    Ok(())
}

/// Replace `target` with `contents` via a rename from `staging`.
fn write_atomic(target: &Path, staging: &Path, contents: &str) -> Result<(), StoreError> {
    if let Err(source) = fs::write(staging, contents) {
        let _ = fs::remove_file(staging);
        return Err(StoreError::Io {
            path: staging.to_path_buf(),
            source,
        });
    }

    fs::rename(staging, target).map_err(|source| {
        let _ = fs::remove_file(staging);
        StoreError::Io {
            path: target.to_path_buf(),
            source,
        }
    })
}
