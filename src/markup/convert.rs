//! markup::convert
//!
//! HTML → Markdown for the markup produced by the rich-text editor.
//!
//! The editor emits a small, well-formed subset of HTML: headings,
//! paragraphs, inline emphasis, links, images, line breaks, lists, quotes,
//! and code blocks. Input is parsed into a lightweight element tree (tolerant
//! of stray or unclosed tags) and written back out as CommonMark.
//!
//! | HTML | Markdown |
//! |------|----------|
//! | `<h1>`..`<h6>` | `#`..`######` |
//! | `<strong>`, `<b>` | `**text**` |
//! | `<em>`, `<i>` | `*text*` |
//! | `<s>`, `<del>` | `~~text~~` |
//! | `<a href>` | `[text](href)` |
//! | `<img>` | `![alt](src)` |
//! | `<br>` | hard break |
//! | `<ul>`, `<ol>`, `<li>` | `- item`, `1. item` |
//! | `<blockquote>` | `> ` |
//! | `<pre>` | fenced block |
//! | `<u>`, `<span>`, ... | text only |

use super::{ConvertError, Converter};

/// Deepest element nesting accepted.
const MAX_DEPTH: usize = 256;

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "details",
    "div",
    "dl",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "td",
    "th",
    "thead",
    "tr",
    "ul",
];

/// Converter for editor HTML.
#[derive(Debug, Clone, Default)]
pub struct HtmlConverter;

impl Converter for HtmlConverter {
    fn convert(&self, html: &str) -> Result<String, ConvertError> {
        let root = parse(html)?;
        let mut blocks = Vec::new();
        render_blocks(&root.children, &mut blocks);
        Ok(blocks.join("\n\n"))
    }
}

// =============================================================================
// Tree
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn new(name: impl Into<String>, attrs: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            attrs,
            children: Vec::new(),
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn push_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(&text);
        } else {
            self.children.push(Node::Text(text));
        }
    }

    fn is_block(&self) -> bool {
        BLOCK_TAGS.contains(&self.name.as_str())
    }

    fn heading_level(&self) -> Option<usize> {
        match self.name.as_str() {
            "h1" => Some(1),
            "h2" => Some(2),
            "h3" => Some(3),
            "h4" => Some(4),
            "h5" => Some(5),
            "h6" => Some(6),
            _ => None,
        }
    }
}

fn is_block(node: &Node) -> bool {
    matches!(node, Node::Element(el) if el.is_block())
}

// =============================================================================
// Parsing
// =============================================================================

enum RawTag {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    Ignored,
}

fn parse(html: &str) -> Result<Element, ConvertError> {
    let mut stack = vec![Element::new("#root", Vec::new())];
    let mut rest = html;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map(|i| &after[i + 3..]).unwrap_or("");
            continue;
        }

        if rest.starts_with('<') {
            if let Some((tag, after)) = parse_tag(rest) {
                rest = after;
                match tag {
                    RawTag::Open {
                        name,
                        attrs,
                        self_closing,
                    } => {
                        if RAW_TEXT_TAGS.contains(&name.as_str()) {
                            rest = skip_raw_text(rest, &name);
                        } else if self_closing || VOID_TAGS.contains(&name.as_str()) {
                            push_node(&mut stack, Node::Element(Element::new(name, attrs)));
                        } else {
                            if stack.len() > MAX_DEPTH {
                                return Err(ConvertError::TooDeep { limit: MAX_DEPTH });
                            }
                            stack.push(Element::new(name, attrs));
                        }
                    }
                    RawTag::Close { name } => close(&mut stack, &name),
                    RawTag::Ignored => {}
                }
                continue;
            }
        }

        // Text runs to the next '<'. A '<' that did not start a tag is text.
        let skip = usize::from(rest.starts_with('<'));
        let end = rest[skip..]
            .find('<')
            .map(|i| i + skip)
            .unwrap_or(rest.len());
        if let Some(top) = stack.last_mut() {
            top.push_text(decode_entities(&rest[..end]));
        }
        rest = &rest[end..];
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    Ok(stack.pop().unwrap_or_else(|| Element::new("#root", Vec::new())))
}

fn push_node(stack: &mut [Element], node: Node) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

fn close_top(stack: &mut Vec<Element>) {
    if let Some(el) = stack.pop() {
        push_node(stack, Node::Element(el));
    }
}

/// Close the innermost open `name`, implicitly closing anything inside it.
/// Unmatched close tags are ignored.
fn close(stack: &mut Vec<Element>, name: &str) {
    if let Some(pos) = stack.iter().rposition(|el| el.name == name) {
        if pos == 0 {
            return;
        }
        while stack.len() > pos {
            close_top(stack);
        }
    }
}

fn skip_raw_text<'a>(rest: &'a str, name: &str) -> &'a str {
    let closing = format!("</{name}");
    let lower = rest.to_ascii_lowercase();
    match lower.find(&closing) {
        Some(start) => match rest[start..].find('>') {
            Some(end) => &rest[start + end + 1..],
            None => "",
        },
        None => "",
    }
}

/// Parse one tag at the start of `s` (which begins with `<`).
///
/// Returns `None` if `s` does not start a well-formed tag, in which case the
/// `<` is treated as text.
fn parse_tag(s: &str) -> Option<(RawTag, &str)> {
    let body = &s[1..];

    if body.starts_with('!') || body.starts_with('?') {
        let end = body.find('>')?;
        return Some((RawTag::Ignored, &body[end + 1..]));
    }

    if let Some(after_slash) = body.strip_prefix('/') {
        let name_len = tag_name_len(after_slash);
        if name_len == 0 {
            return None;
        }
        let end = after_slash.find('>')?;
        let name = after_slash[..name_len].to_ascii_lowercase();
        return Some((RawTag::Close { name }, &after_slash[end + 1..]));
    }

    let name_len = tag_name_len(body);
    if name_len == 0 {
        return None;
    }
    let name = body[..name_len].to_ascii_lowercase();
    let mut rest = &body[name_len..];
    let mut attrs = Vec::new();

    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("/>") {
            return Some((
                RawTag::Open {
                    name,
                    attrs,
                    self_closing: true,
                },
                after,
            ));
        }
        if let Some(after) = rest.strip_prefix('>') {
            return Some((
                RawTag::Open {
                    name,
                    attrs,
                    self_closing: false,
                },
                after,
            ));
        }
        if rest.is_empty() {
            return None;
        }

        let key_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(rest.len());
        if key_len == 0 {
            // stray '/' or '='
            rest = &rest[1..];
            continue;
        }
        let key = rest[..key_len].to_ascii_lowercase();
        rest = rest[key_len..].trim_start();

        let mut value = String::new();
        if let Some(after_eq) = rest.strip_prefix('=') {
            rest = after_eq.trim_start();
            if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
                let inner = &rest[1..];
                let end = inner.find(quote)?;
                value = decode_entities(&inner[..end]);
                rest = &inner[end + 1..];
            } else {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                value = decode_entities(&rest[..end]);
                rest = &rest[end..];
            }
        }
        attrs.push((key, value));
    }
}

fn tag_name_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-'))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Decode named and numeric character references.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        let decoded = rest
            .find(';')
            .filter(|end| *end <= 12)
            .and_then(|end| lookup_entity(&rest[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn lookup_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "copy" => '\u{a9}',
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            return char::from_u32(code);
        }
    };
    Some(c)
}

// =============================================================================
// Block rendering
// =============================================================================

fn render_blocks(nodes: &[Node], out: &mut Vec<String>) {
    let mut run: Vec<&Node> = Vec::new();
    for node in nodes {
        match node {
            Node::Element(el) if el.is_block() => {
                flush_paragraph(&run, out);
                run.clear();
                render_block(el, out);
            }
            _ => run.push(node),
        }
    }
    flush_paragraph(&run, out);
}

fn flush_paragraph(run: &[&Node], out: &mut Vec<String>) {
    let mut inline = Inline::default();
    for node in run {
        inline.node(node);
    }
    let text = finish_paragraph(&inline.out);
    if !text.is_empty() {
        out.push(text);
    }
}

fn render_block(el: &Element, out: &mut Vec<String>) {
    if let Some(level) = el.heading_level() {
        let mut inline = Inline::default();
        inline.nodes(&el.children);
        let text = inline.out.replace("  \n", " ");
        let text = text.trim();
        if !text.is_empty() {
            out.push(format!("{} {}", "#".repeat(level), escape_closing_hash(text)));
        }
        return;
    }

    match el.name.as_str() {
        "hr" => out.push("* * *".to_string()),
        "pre" => {
            let code = text_content(&el.children);
            let code = code.trim_end_matches('\n');
            let mut fence = "```".to_string();
            while code.contains(fence.as_str()) {
                fence.push('`');
            }
            out.push(format!("{fence}\n{code}\n{fence}"));
        }
        "blockquote" => {
            let mut inner = Vec::new();
            render_blocks(&el.children, &mut inner);
            if !inner.is_empty() {
                out.push(prefix_lines(&inner.join("\n\n"), "> ", ">"));
            }
        }
        "ul" | "ol" => {
            let list = render_list(el);
            if !list.is_empty() {
                out.push(list);
            }
        }
        "p" if !el.children.iter().any(is_block) => {
            let run: Vec<&Node> = el.children.iter().collect();
            flush_paragraph(&run, out);
        }
        _ => render_blocks(&el.children, out),
    }
}

fn render_list(el: &Element) -> String {
    let mut number: u64 = el.attr("start").and_then(|s| s.parse().ok()).unwrap_or(1);
    let mut items = Vec::new();

    for child in &el.children {
        let Node::Element(item) = child else { continue };
        if item.name != "li" {
            continue;
        }

        // The editor marks bullets inside <ol> with data-list="bullet".
        let ordered = match item.attr("data-list") {
            Some("bullet") => false,
            Some("ordered") => true,
            _ => el.name == "ol",
        };
        let marker = if ordered {
            let m = format!("{number}. ");
            number += 1;
            m
        } else {
            "- ".to_string()
        };

        let mut blocks = Vec::new();
        render_blocks(&item.children, &mut blocks);
        let content = blocks.join("\n");
        let indent = " ".repeat(marker.len());
        items.push(format!("{}{}", marker, indent_continuation(&content, &indent)));
    }

    items.join("\n")
}

fn indent_continuation(text: &str, indent: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn prefix_lines(text: &str, prefix: &str, empty_prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                empty_prefix.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim a rendered paragraph and escape every line that would otherwise
/// start a different block construct. Lines after a hard break count too.
fn finish_paragraph(text: &str) -> String {
    text.trim()
        .split('\n')
        .map(escape_line_start)
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_line_start(line: &str) -> String {
    if line.starts_with(['#', '>', '-', '+', '=']) {
        return format!("\\{line}");
    }

    // "1. text" would become a list
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && matches!(line[digits..].chars().next(), Some('.' | ')')) {
        return format!("{}\\{}", &line[..digits], &line[digits..]);
    }

    line.to_string()
}

/// A heading ending in `#` would lose it as a closing sequence.
fn escape_closing_hash(text: &str) -> String {
    match text.strip_suffix('#') {
        Some(head) => format!("{head}\\#"),
        None => text.to_string(),
    }
}

/// Length of the longest run of `c` in `s`.
fn longest_run(s: &str, c: char) -> usize {
    s.split(|x| x != c).map(|run| run.chars().count()).max().unwrap_or(0)
}

fn text_content(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) if el.name == "br" => out.push('\n'),
            Node::Element(el) => {
                out.push_str(&text_content(&el.children));
                if el.is_block() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
    }
    out
}

// =============================================================================
// Inline rendering
// =============================================================================

#[derive(Default)]
struct Inline {
    out: String,
}

impl Inline {
    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.node(node);
        }
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Text(t) => self.text(t),
            Node::Element(el) => self.element(el),
        }
    }

    fn ends_with_space(&self) -> bool {
        self.out.chars().last().map_or(true, char::is_whitespace)
    }

    /// Append text with collapsed whitespace and Markdown escaping.
    fn text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                if !self.ends_with_space() {
                    self.out.push(' ');
                }
                continue;
            }
            if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '~' | '&' | '|') {
                self.out.push('\\');
            }
            self.out.push(c);
        }
    }

    fn raw(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn element(&mut self, el: &Element) {
        match el.name.as_str() {
            "strong" | "b" => self.delimited(el, "**"),
            "em" | "i" => self.delimited(el, "*"),
            "s" | "strike" | "del" => self.delimited(el, "~~"),
            "br" => self.raw("  \n"),
            "code" => {
                let code = text_content(&el.children).replace('\n', " ");
                if code.is_empty() {
                    return;
                }
                let fence = "`".repeat(longest_run(&code, '`') + 1);
                let pad = if code.starts_with('`') || code.ends_with('`') {
                    " "
                } else {
                    ""
                };
                self.raw(&format!("{fence}{pad}{code}{pad}{fence}"));
            }
            "a" => {
                let mut inner = Inline::default();
                inner.nodes(&el.children);
                let label = inner.out.trim().to_string();
                match el.attr("href").filter(|h| !h.is_empty()) {
                    Some(href) => {
                        let label = if label.is_empty() {
                            escape_label(href)
                        } else {
                            label
                        };
                        self.raw(&format!("[{}]({})", label, link_target(href)));
                    }
                    None => self.raw(&label),
                }
            }
            "img" => {
                if let Some(src) = el.attr("src").filter(|s| !s.is_empty()) {
                    let alt = escape_label(el.attr("alt").unwrap_or(""));
                    self.raw(&format!("![{}]({})", alt, link_target(src)));
                }
            }
            _ => {
                if el.is_block() && !self.ends_with_space() {
                    self.out.push(' ');
                }
                self.nodes(&el.children);
            }
        }
    }

    /// Wrap an element's content in `delim`, keeping edge whitespace outside
    /// the delimiters (`** x**` is not emphasis in CommonMark).
    fn delimited(&mut self, el: &Element, delim: &str) {
        let mut inner = Inline::default();
        inner.nodes(&el.children);
        let trimmed = inner.out.trim();
        let source = text_content(&el.children);

        if trimmed.is_empty() {
            if !source.is_empty() {
                self.text(" ");
            }
            return;
        }
        if source.starts_with(char::is_whitespace) {
            self.text(" ");
        }
        self.raw(&format!("{delim}{trimmed}{delim}"));
        if source.ends_with(char::is_whitespace) {
            self.text(" ");
        }
    }
}

fn escape_label(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '[' | ']' | '&') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn link_target(href: &str) -> String {
    let href = href.replace('&', "\\&");
    if href.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{}>", href.replace('<', "%3C").replace('>', "%3E"))
    } else {
        href
    }
}
