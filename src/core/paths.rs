//! core::paths
//!
//! Centralized path routing for documents in the store.
//!
//! # Storage Layout
//!
//! The store is a git working copy. Documents live under `content/`, one
//! Markdown file per page:
//! - `content/<page>.md` - document for page path `<page>`
//!
//! **Hard rule:** No code may build a document path by hand. All document
//! locations go through `StorePaths`, which only accepts validated
//! [`PagePath`]s and therefore can never point outside the content root.
//!
//! # Example
//!
//! ```
//! use wikiedit::core::paths::StorePaths;
//! use wikiedit::core::types::PagePath;
//! use std::path::PathBuf;
//!
//! let paths = StorePaths::new(PathBuf::from("/srv/wiki"));
//! let page = PagePath::new("foo/test").unwrap();
//!
//! assert_eq!(
//!     paths.document_path(&page),
//!     PathBuf::from("/srv/wiki/content/foo/test.md")
//! );
//! assert_eq!(paths.document_pathspec(&page), "content/foo/test.md");
//! ```

use std::path::{Path, PathBuf};

use crate::core::types::PagePath;

/// Directory (relative to the work dir) holding all documents.
pub const CONTENT_DIR: &str = "content";

/// File extension of documents.
pub const DOCUMENT_EXT: &str = "md";

/// Path routing for a store rooted at a git working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    work_dir: PathBuf,
}

impl StorePaths {
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    /// The git working directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// `<work_dir>/content`
    pub fn content_dir(&self) -> PathBuf {
        self.work_dir.join(CONTENT_DIR)
    }

    /// Absolute location of the document for `page`.
    pub fn document_path(&self, page: &PagePath) -> PathBuf {
        let mut path = self.content_dir();
        let mut segments = page.segments().peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                // set_extension would eat a dotted final segment
                path.push(format!("{segment}.{DOCUMENT_EXT}"));
            }
        }
        path
    }

    /// Work-dir relative pathspec for `page`, as passed to `git add`.
    ///
    /// Always `/`-separated regardless of platform.
    pub fn document_pathspec(&self, page: &PagePath) -> String {
        format!("{}/{}.{}", CONTENT_DIR, page.as_str(), DOCUMENT_EXT)
    }

    /// Scratch file used while atomically replacing `page`'s document.
    ///
    /// Lives next to the target so the final rename stays on one filesystem.
    pub fn staging_path(&self, page: &PagePath) -> PathBuf {
        let mut path = self.document_path(page);
        path.set_extension(format!("{DOCUMENT_EXT}.tmp"));
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> StorePaths {
        StorePaths::new(PathBuf::from("/wiki"))
    }

    #[test]
    fn content_dir_under_work_dir() {
        assert_eq!(paths().content_dir(), PathBuf::from("/wiki/content"));
    }

    #[test]
    fn document_path_appends_extension() {
        let page = PagePath::new("index").unwrap();
        assert_eq!(
            paths().document_path(&page),
            PathBuf::from("/wiki/content/index.md")
        );
    }

    #[test]
    fn dotted_page_keeps_its_dot() {
        let page = PagePath::new("release/v1.2").unwrap();
        assert_eq!(
            paths().document_path(&page),
            PathBuf::from("/wiki/content/release/v1.2.md")
        );
        assert_eq!(paths().document_pathspec(&page), "content/release/v1.2.md");
    }

    #[test]
    fn staging_path_is_sibling() {
        let page = PagePath::new("foo/test").unwrap();
        let staging = paths().staging_path(&page);
        assert_eq!(staging, PathBuf::from("/wiki/content/foo/test.md.tmp"));
        assert_eq!(
            staging.parent(),
            paths().document_path(&page).parent()
        );
    }
}
