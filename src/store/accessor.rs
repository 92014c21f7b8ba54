//! store::accessor
//!
//! Read path: load a document, drop its frontmatter, render the body.

use serde::Serialize;

use super::{Store, StoreError};
use crate::core::frontmatter;
use crate::core::types::PagePath;

/// A rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Rendered body, frontmatter removed.
    pub html: String,
    /// `title` from the frontmatter, when present.
    pub title: Option<String>,
}

impl Store {
    /// Read and render the document for `path`.
    ///
    /// Returns `Ok(None)` if the page has no document.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if the document exists but cannot be read.
    pub fn read(&self, path: &PagePath) -> Result<Option<Page>, StoreError> {
        let raw = {
            let ws = self.workspace.lock();
            let file = ws.paths.document_path(path);
            match std::fs::read_to_string(&file) {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(source) => return Err(StoreError::Io { path: file, source }),
            }
        };

        let doc = frontmatter::split(&raw);
        Ok(Some(Page {
            html: self.renderer.render(doc.body),
            title: doc.frontmatter.and_then(|fm| fm.title()),
        }))
    }
}
