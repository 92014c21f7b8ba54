//! core::frontmatter
//!
//! Parsing and merging of `+++`-delimited frontmatter blocks.
//!
//! # Format
//!
//! A document may start with a frontmatter block: a line consisting of
//! exactly `+++`, any number of metadata lines (TOML by convention), and a
//! closing `+++` line. Everything after the closing line is the body.
//!
//! ```text
//! +++
//! title = "Setup"
//! +++
//!
//! # Setup
//! ```
//!
//! A block that is never closed is not a block; the whole document is body.
//!
//! # Invariant
//!
//! Edits may only change the body. [`merge`] enforces that the metadata of
//! the file already on disk always wins over whatever the editor sends back:
//! it is kept verbatim when present, and never introduced when absent.

/// The delimiter line.
pub const MARKER: &str = "+++";

/// A frontmatter block borrowed from a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frontmatter<'a> {
    raw: &'a str,
}

impl<'a> Frontmatter<'a> {
    /// The block exactly as it appears in the document, markers included.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// The text between the two marker lines.
    pub fn content(&self) -> &'a str {
        let inner = self.raw.trim_end_matches(['\n', '\r']);
        let inner = inner
            .strip_suffix(MARKER)
            .unwrap_or(inner)
            .trim_end_matches(['\n', '\r']);
        let start = self.raw.find('\n').map(|i| i + 1).unwrap_or(self.raw.len());
        inner.get(start..).unwrap_or("")
    }

    /// The `title` key, if the content parses as TOML and has one.
    pub fn title(&self) -> Option<String> {
        let table: toml::Table = toml::from_str(self.content()).ok()?;
        table.get("title")?.as_str().map(str::to_string)
    }

    /// The block, guaranteed to end with a newline.
    fn terminated(&self) -> String {
        if self.raw.ends_with('\n') {
            self.raw.to_string()
        } else {
            format!("{}\n", self.raw)
        }
    }
}

/// A document split into its optional frontmatter and its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Document<'a> {
    pub frontmatter: Option<Frontmatter<'a>>,
    pub body: &'a str,
}

fn is_marker(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']) == MARKER
}

/// Split a document into frontmatter and body.
///
/// ```
/// use wikiedit::core::frontmatter::split;
///
/// let doc = split("+++\ntitle = \"x\"\n+++\nbody\n");
/// assert_eq!(doc.frontmatter.unwrap().raw(), "+++\ntitle = \"x\"\n+++\n");
/// assert_eq!(doc.body, "body\n");
///
/// let plain = split("# just a body\n");
/// assert!(plain.frontmatter.is_none());
/// ```
pub fn split(doc: &str) -> Document<'_> {
    let mut lines = doc.split_inclusive('\n');
    let no_block = Document {
        frontmatter: None,
        body: doc,
    };

    match lines.next() {
        Some(first) if is_marker(first) => {
            let mut offset = first.len();
            for line in lines {
                offset += line.len();
                if is_marker(line) {
                    return Document {
                        frontmatter: Some(Frontmatter { raw: &doc[..offset] }),
                        body: &doc[offset..],
                    };
                }
            }
            no_block
        }
        _ => no_block,
    }
}

/// Remove the frontmatter block (if any), returning only the body.
pub fn strip(doc: &str) -> &str {
    split(doc).body
}

/// Merge the frontmatter of `existing` into `incoming`.
///
/// - `existing` has no block: every block in `incoming` is dropped.
/// - both have a block: `incoming`'s block is replaced by `existing`'s.
/// - only `existing` has a block: it is prepended, separated by a blank line.
///
/// ```
/// use wikiedit::core::frontmatter::merge;
///
/// let existing = "+++\ntitle = \"kept\"\n+++\nold body";
/// assert_eq!(merge(existing, "new body"), "+++\ntitle = \"kept\"\n+++\n\nnew body");
/// assert_eq!(merge("old body", "+++\nsneaky = 1\n+++\nnew body"), "new body");
/// ```
pub fn merge(existing: &str, incoming: &str) -> String {
    let (body, had_block) = strip_all(incoming);

    match (split(existing).frontmatter, had_block) {
        (None, _) => body.trim_start_matches(['\n', '\r']).to_string(),
        (Some(kept), true) => format!("{}{}", kept.terminated(), body),
        (Some(kept), false) => format!("{}\n{}", kept.terminated(), body),
    }
}

/// Remove every leading block, including stacked blocks and blocks after
/// blank lines. Returns the remaining body and whether anything was removed.
fn strip_all(doc: &str) -> (&str, bool) {
    let mut body = doc;
    let mut removed = false;
    loop {
        let rest = split(body.trim_start_matches(['\n', '\r']));
        if rest.frontmatter.is_none() {
            return (body, removed);
        }
        body = rest.body;
        removed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_without_block() {
        let doc = split("# hello\n__world__\n");
        assert!(doc.frontmatter.is_none());
        assert_eq!(doc.body, "# hello\n__world__\n");
    }

    #[test]
    fn split_with_block() {
        let doc = split("+++\na = 1\nb = 2\n+++\n# hi\n");
        let fm = doc.frontmatter.unwrap();
        assert_eq!(fm.raw(), "+++\na = 1\nb = 2\n+++\n");
        assert_eq!(fm.content(), "a = 1\nb = 2");
        assert_eq!(doc.body, "# hi\n");
    }

    #[test]
    fn split_empty_block() {
        let doc = split("+++\n+++\nbody");
        assert_eq!(doc.frontmatter.unwrap().content(), "");
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn unterminated_block_is_body() {
        let doc = split("+++\ntitle = \"x\"\nno closing marker\n");
        assert!(doc.frontmatter.is_none());
        assert_eq!(doc.body, "+++\ntitle = \"x\"\nno closing marker\n");
    }

    #[test]
    fn block_must_start_the_document() {
        let doc = split("intro\n+++\na = 1\n+++\n");
        assert!(doc.frontmatter.is_none());
    }

    #[test]
    fn marker_with_extra_text_is_not_a_marker() {
        let doc = split("+++ toml\na = 1\n+++\n");
        assert!(doc.frontmatter.is_none());
    }

    #[test]
    fn crlf_markers_recognized() {
        let doc = split("+++\r\na = 1\r\n+++\r\nbody\r\n");
        let fm = doc.frontmatter.unwrap();
        assert_eq!(fm.raw(), "+++\r\na = 1\r\n+++\r\n");
        assert_eq!(doc.body, "body\r\n");
    }

    #[test]
    fn closing_marker_at_eof() {
        let doc = split("+++\na = 1\n+++");
        assert_eq!(doc.frontmatter.unwrap().raw(), "+++\na = 1\n+++");
        assert_eq!(doc.body, "");
    }

    #[test]
    fn title_from_toml() {
        let doc = split("+++\ntitle = \"Getting started\"\nweight = 3\n+++\nbody");
        assert_eq!(
            doc.frontmatter.unwrap().title().as_deref(),
            Some("Getting started")
        );
    }

    #[test]
    fn title_missing_or_unparseable() {
        let no_title = split("+++\nweight = 3\n+++\nbody");
        assert_eq!(no_title.frontmatter.unwrap().title(), None);

        let garbage = split("+++\nthis is not toml\n+++\nbody");
        assert_eq!(garbage.frontmatter.unwrap().title(), None);
    }

    #[test]
    fn strip_removes_only_block() {
        assert_eq!(strip("+++\na = 1\n+++\n# body\n"), "# body\n");
        assert_eq!(strip("# body\n"), "# body\n");
    }

    #[test]
    fn merge_existing_without_block_strips_incoming() {
        let merged = merge("# old\n", "+++\ninjected = true\n+++\n\n# new");
        assert_eq!(merged, "# new");
    }

    #[test]
    fn merge_strips_stacked_incoming_blocks() {
        let incoming = "+++\na = 1\n+++\n+++\nb = 2\n+++\nnew body";
        let merged = merge("# old body\n", incoming);
        assert_eq!(merged, "new body");
        assert!(split(&merged).frontmatter.is_none());
    }

    #[test]
    fn merge_strips_block_after_blank_lines() {
        let merged = merge("# old\n", "\n\n+++\nb = 2\n+++\nnew");
        assert_eq!(merged, "new");
    }

    #[test]
    fn merge_existing_wins_over_stacked_blocks() {
        let existing = "+++\ntitle = \"real\"\n+++\n# old\n";
        let incoming = "+++\na = 1\n+++\n\n+++\nb = 2\n+++\n# new";
        let merged = merge(existing, incoming);
        assert_eq!(merged, "+++\ntitle = \"real\"\n+++\n# new");
        assert_eq!(split(&merged).body, "# new");
    }

    #[test]
    fn merge_neither_has_block() {
        assert_eq!(merge("# old\n", "# new"), "# new");
    }

    #[test]
    fn merge_both_have_block_existing_wins() {
        let existing = "+++\ntitle = \"real\"\n+++\n# old\n";
        let incoming = "+++\ntitle = \"edited\"\n+++\n# new";
        assert_eq!(merge(existing, incoming), "+++\ntitle = \"real\"\n+++\n# new");
    }

    #[test]
    fn merge_only_existing_has_block() {
        let existing = "+++\ntitle = \"real\"\n+++\n# old\n";
        assert_eq!(
            merge(existing, "# new"),
            "+++\ntitle = \"real\"\n+++\n\n# new"
        );
    }

    #[test]
    fn merge_existing_block_at_eof_gets_newline() {
        let existing = "+++\ntitle = \"real\"\n+++";
        assert_eq!(
            merge(existing, "# new"),
            "+++\ntitle = \"real\"\n+++\n\n# new"
        );
    }

    #[test]
    fn merge_preserves_block_bytes() {
        let block = "+++\r\ntitle = \"crlf\"  \r\ntags = [\"a\", \"b\"]\r\n+++\r\n";
        let existing = format!("{block}old");
        let merged = merge(&existing, "new");
        assert!(merged.starts_with(block));
    }
}
