//! markup
//!
//! Conversion between the editor's HTML and the store's Markdown.
//!
//! # Architecture
//!
//! The store never depends on a concrete markup library. It holds a
//! [`Renderer`] (Markdown → HTML, for display in the editor) and a
//! [`Converter`] (HTML → Markdown, for persisting edits). The defaults are
//! [`MarkdownRenderer`] and [`HtmlConverter`].
//!
//! Round trips are lossy by nature: the converter produces canonical
//! Markdown (`**` for strong, ATX headings), so the first save of a page
//! written by hand may normalize its syntax.

mod convert;
mod render;

pub use convert::HtmlConverter;
pub use render::MarkdownRenderer;

use thiserror::Error;

/// Errors from converting editor markup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    /// Input nests elements deeper than the converter accepts.
    #[error("markup nested deeper than {limit} elements")]
    TooDeep {
        /// The nesting limit
        limit: usize,
    },
}

/// Renders stored Markdown into HTML for the editor.
pub trait Renderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// Converts editor HTML into Markdown for storage.
pub trait Converter: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ConvertError`] if the input cannot be converted.
    fn convert(&self, html: &str) -> Result<String, ConvertError>;
}
