//! markup::render
//!
//! Markdown → HTML using pulldown-cmark.
//!
//! Two adjustments on top of the stock HTML writer:
//! - every heading without an explicit `{#id}` gets an id derived from its
//!   text (`## Hello, World` → `hello-world`; repeats get `-1`, `-2`, ...)
//! - top-level blocks are separated by a blank line

use std::collections::HashSet;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

use super::Renderer;

/// CommonMark renderer with tables, strikethrough, footnotes, and
/// generated heading anchors.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_HEADING_ATTRIBUTES,
        }
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, markdown: &str) -> String {
        let mut events: Vec<Event<'_>> = Parser::new_ext(markdown, self.options).collect();
        assign_heading_ids(&mut events);

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        for (i, block) in top_level_blocks(events).into_iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            html::push_html(&mut out, block.into_iter());
        }
        out
    }
}

/// Split an event stream into one group per top-level block.
fn top_level_blocks(events: Vec<Event<'_>>) -> Vec<Vec<Event<'_>>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;

    for event in events {
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        current.push(event);
        if depth == 0 {
            blocks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Give every heading lacking an explicit id one derived from its text.
fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut used: HashSet<String> = events
        .iter()
        .filter_map(|e| match e {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();

    let mut i = 0;
    while i < events.len() {
        if !matches!(events[i], Event::Start(Tag::Heading { id: None, .. })) {
            i += 1;
            continue;
        }

        let mut text = String::new();
        let mut end = i + 1;
        while end < events.len() && !matches!(events[end], Event::End(TagEnd::Heading(_))) {
            if let Event::Text(t) | Event::Code(t) = &events[end] {
                text.push_str(t);
            }
            end += 1;
        }

        let slug = anchor_slug(&text);
        if !slug.is_empty() {
            let unique = unique_slug(slug, &mut used);
            if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
                *id = Some(CowStr::from(unique));
            }
        }
        i = end;
    }
}

/// Lowercased letters and digits; every run of anything else becomes one `-`.
/// Leading and trailing separators are dropped.
fn anchor_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn unique_slug(slug: String, used: &mut HashSet<String>) -> String {
    if used.insert(slug.clone()) {
        return slug;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{slug}-{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(md: &str) -> String {
        MarkdownRenderer::default().render(md)
    }

    #[test]
    fn heading_and_paragraph() {
        assert_eq!(
            render("# hello\n__world__\n"),
            "<h1 id=\"hello\">hello</h1>\n\n<p><strong>world</strong></p>\n"
        );
    }

    #[test]
    fn multi_word_heading_id() {
        assert_eq!(
            render("# hello again\n\n**world**"),
            "<h1 id=\"hello-again\">hello again</h1>\n\n<p><strong>world</strong></p>\n"
        );
    }

    #[test]
    fn duplicate_headings_get_suffixes() {
        let html = render("## Intro\n\n## Intro\n\n## Intro\n");
        assert!(html.contains("<h2 id=\"intro\">"));
        assert!(html.contains("<h2 id=\"intro-1\">"));
        assert!(html.contains("<h2 id=\"intro-2\">"));
    }

    #[test]
    fn explicit_id_kept_and_reserved() {
        let html = render("# Custom {#setup}\n\n# Setup\n");
        assert!(html.contains("<h1 id=\"setup\">Custom</h1>"));
        assert!(html.contains("<h1 id=\"setup-1\">Setup</h1>"));
    }

    #[test]
    fn slug_rules() {
        assert_eq!(anchor_slug("Hello, World!"), "hello-world");
        assert_eq!(anchor_slug("  --Leading and trailing--  "), "leading-and-trailing");
        assert_eq!(anchor_slug("v1.2 release"), "v1-2-release");
        assert_eq!(anchor_slug("Größe"), "größe");
        assert_eq!(anchor_slug("!!!"), "");
    }

    #[test]
    fn heading_with_inline_code() {
        let html = render("# Use `git pull`\n");
        assert!(html.starts_with("<h1 id=\"use-git-pull\">"));
    }

    #[test]
    fn punctuation_only_heading_has_no_id() {
        assert_eq!(render("# ???\n"), "<h1>???</h1>\n");
    }

    #[test]
    fn blocks_separated_by_blank_line() {
        assert_eq!(
            render("one\n\n- a\n- b\n\n---\n"),
            "<p>one</p>\n\n<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n\n<hr />\n"
        );
    }

    #[test]
    fn empty_document() {
        assert_eq!(render(""), "");
    }

    #[test]
    fn strikethrough_enabled() {
        assert_eq!(render("~~gone~~"), "<p><del>gone</del></p>\n");
    }
}
