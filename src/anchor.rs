//! Link-stable identifiers derived from heading text.
//!
//! The same function stamps headings at parse time and looks them up when the table of contents
//! is resolved. It is intentionally lossy: `"Results!"` and `"Results?"` both map to `results`,
//! and the later heading wins in the page-tracking table.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Anchor assigned when the heading text normalises to nothing.
pub const EMPTY_ANCHOR: &str = "section";

/// Normalised, link-stable identifier of a heading.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnchorName(String);

impl AnchorName {
    /// Derives the anchor for `text`. Pure and total.
    pub fn from_heading(text: &str) -> Self {
        Self(anchor_name(text))
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier as an in-document link target (`#intro`).
    pub fn href(&self) -> String {
        format!("#{}", self.0)
    }
}

impl fmt::Display for AnchorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AnchorName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn strip_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\w\s-]").expect("static anchor pattern is valid"))
}

fn collapse_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[-\s]+").expect("static anchor pattern is valid"))
}

/// Normalises heading text into an anchor identifier.
///
/// Characters other than word characters, whitespace and hyphens are removed, runs of whitespace
/// and hyphens collapse into one underscore, and the result is lower-cased.
pub fn anchor_name(text: &str) -> String {
    let stripped = strip_pattern().replace_all(text, "");
    let collapsed = collapse_pattern().replace_all(&stripped, "_");
    let anchor = collapsed.to_lowercase();
    if anchor.is_empty() {
        EMPTY_ANCHOR.to_owned()
    } else {
        anchor
    }
}
