//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`PagePath`] - Validated logical document path (`foo/bar`)
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`Author`] - Identity of the person submitting an edit
//! - [`Attribution`] - How an author is recorded in commit messages
//!
//! # Validation
//!
//! These types enforce validity at construction time. A `PagePath` can never
//! escape the content directory, so the store never has to re-check it.
//!
//! # Examples
//!
//! ```
//! use wikiedit::core::types::{BranchName, PagePath};
//!
//! let page = PagePath::new("guides/setup").unwrap();
//! assert_eq!(page.as_str(), "guides/setup");
//!
//! assert!(PagePath::new("../etc/passwd").is_err());
//! assert!(BranchName::new("invalid..name").is_err());
//! ```

use serde::{Deserialize, Serialize};
use md5::{Digest, Md5};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid page path: {0}")]
    InvalidPagePath(String),
}

/// A validated logical page path.
///
/// Page paths are slash-separated and relative to the content root:
/// - Cannot be empty
/// - Cannot start or end with `/`
/// - Cannot contain empty, `.` or `..` segments
/// - Cannot contain `\` or control characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PagePath(String);

impl PagePath {
    /// Create a new validated page path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPagePath` if the path could escape the
    /// content root or is otherwise malformed.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        Self::validate(&path)?;
        Ok(Self(path))
    }

    fn validate(path: &str) -> Result<(), TypeError> {
        if path.is_empty() {
            return Err(TypeError::InvalidPagePath(
                "page path cannot be empty".into(),
            ));
        }
        if path.contains('\\') {
            return Err(TypeError::InvalidPagePath(
                "page path cannot contain '\\'".into(),
            ));
        }
        if path.chars().any(|c| c.is_control()) {
            return Err(TypeError::InvalidPagePath(
                "page path cannot contain control characters".into(),
            ));
        }
        for segment in path.split('/') {
            match segment {
                "" => {
                    return Err(TypeError::InvalidPagePath(format!(
                        "'{path}' has an empty segment"
                    )))
                }
                "." | ".." => {
                    return Err(TypeError::InvalidPagePath(format!(
                        "'{path}' contains a relative segment"
                    )))
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Get the page path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl TryFrom<String> for PagePath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PagePath> for String {
    fn from(path: PagePath) -> Self {
        path.0
    }
}

impl std::fmt::Display for PagePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |msg: &str| Err(TypeError::InvalidBranchName(msg.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return reject("branch name cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return reject("branch name cannot end with '.lock' or '/'");
        }
        for seq in ["..", "@{", "//"] {
            if name.contains(seq) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{seq}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("branch name cannot contain control characters");
        }

        for component in name.split('/') {
            if component.starts_with('.') {
                return reject("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return reject("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BranchName {
    /// `main`
    fn default() -> Self {
        Self("main".to_string())
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// ```
/// use wikiedit::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an author identity is written into commit messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribution {
    /// First 8 hex characters of `MD5("wiki-editor-" + identity)`. Commits
    /// can be correlated per author without publishing addresses, and the
    /// values match the attribution already present in wiki histories.
    #[default]
    Digest,
    /// The identity string as received.
    Verbatim,
}

impl std::str::FromStr for Attribution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "digest" => Ok(Attribution::Digest),
            "verbatim" => Ok(Attribution::Verbatim),
            other => Err(format!(
                "unknown attribution '{other}', must be one of: digest, verbatim"
            )),
        }
    }
}

impl std::fmt::Display for Attribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribution::Digest => write!(f, "digest"),
            Attribution::Verbatim => write!(f, "verbatim"),
        }
    }
}

/// The author of an edit, taken from the forwarded identity header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    /// No identity was forwarded.
    Anonymous,
    /// Identity string (usually an email address).
    Identified(String),
}

impl Author {
    const ANONYMOUS: &'static str = "<anonymous>";
    const DIGEST_SALT: &'static str = "wiki-editor-";
    const DIGEST_LEN: usize = 8;

    /// Build an author from an optional header value; blank counts as absent.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Author::Identified(v.to_string()),
            _ => Author::Anonymous,
        }
    }

    /// The raw identity string.
    pub fn identity(&self) -> &str {
        match self {
            Author::Anonymous => Self::ANONYMOUS,
            Author::Identified(id) => id,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Author::Anonymous)
    }

    /// Render the author for a commit message under the given posture.
    ///
    /// ```
    /// use wikiedit::core::types::{Attribution, Author};
    ///
    /// let author = Author::from_header(Some("user@test.com"));
    /// assert_eq!(author.attribute(Attribution::Verbatim), "user@test.com");
    /// assert_eq!(author.attribute(Attribution::Digest).len(), 8);
    /// ```
    pub fn attribute(&self, attribution: Attribution) -> String {
        match attribution {
            Attribution::Verbatim => self.identity().to_string(),
            Attribution::Digest => {
                let mut hasher = Md5::new();
                hasher.update(Self::DIGEST_SALT.as_bytes());
                hasher.update(self.identity().as_bytes());
                let digest = hex::encode(hasher.finalize());
                digest[..Self::DIGEST_LEN].to_string()
            }
        }
    }
}
