//! Data structures describing the logical content of a report.
//!
//! The types in this module are produced once per build by the parser and the table-of-contents
//! resolver and are read by both render passes. They do not reference the rendering crate, so a
//! pass can be driven by any [`LayoutEngine`](crate::layout::LayoutEngine).

use crate::anchor::AnchorName;
use crate::richtext::{plain_text, InlineRun};

/// One typed, renderable unit of document structure.
///
/// Consumers match exhaustively, so a new block kind is a compile-checked change at every render
/// site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentBlock {
    /// ATX heading (`#` .. `######`).
    Heading {
        /// Heading level, 1 to 6.
        level: u8,
        /// Heading text as written, markers included.
        text: String,
        /// Resolved inline runs of `text`.
        runs: Vec<InlineRun>,
        /// Link target and tracking key.
        anchor: AnchorName,
    },
    /// Body paragraph.
    Paragraph(Vec<InlineRun>),
    /// `- item` or `* item`.
    BulletItem(Vec<InlineRun>),
    /// `12. item`; `index` keeps the literal digits of the source.
    NumberedItem {
        /// Label digits as written.
        index: String,
        /// Item text.
        runs: Vec<InlineRun>,
    },
    /// `> quoted text`.
    Quote(Vec<InlineRun>),
    /// Fenced code block; lines are verbatim.
    CodeBlock(Vec<String>),
    /// Title line of the table of contents.
    TocTitle(String),
    /// One line of the table of contents.
    TocEntry(TocEntry),
}

impl ContentBlock {
    /// Builds a heading block, resolving inline formatting and computing the anchor.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        let text = text.into();
        Self::Heading {
            level,
            runs: crate::richtext::resolve_inline(&text),
            anchor: AnchorName::from_heading(&text),
            text,
        }
    }

    /// Returns the anchor of a heading block.
    pub fn anchor(&self) -> Option<&AnchorName> {
        match self {
            Self::Heading { anchor, .. } => Some(anchor),
            Self::TocEntry(entry) => Some(&entry.anchor),
            Self::Paragraph(_)
            | Self::BulletItem(_)
            | Self::NumberedItem { .. }
            | Self::Quote(_)
            | Self::CodeBlock(_)
            | Self::TocTitle(_) => None,
        }
    }

    /// Returns whether this block is a heading.
    pub fn is_heading(&self) -> bool {
        matches!(self, Self::Heading { .. })
    }
}

/// A heading collected for the table of contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadingOutlineEntry {
    /// Heading level, 1 to 6.
    pub level: u8,
    /// Heading text as written.
    pub text: String,
    /// Anchor shared with the heading block.
    pub anchor: AnchorName,
}

impl HeadingOutlineEntry {
    /// Creates an outline entry, computing the anchor from `text`.
    pub fn new(level: u8, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            level,
            anchor: AnchorName::from_heading(&text),
            text,
        }
    }

    /// Returns whether this entry is the document title heading.
    pub fn is_title(&self, title: Option<&str>) -> bool {
        self.level == 1 && title.is_some_and(|title| title == self.text)
    }
}

/// One line of the table of contents.
///
/// `title` runs link to the heading anchor. Numbered entries also carry a dot leader and the
/// content page number; unnumbered entries carry neither.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    /// Level of the referenced heading.
    pub level: u8,
    /// Anchor of the referenced heading.
    pub anchor: AnchorName,
    /// Heading text as linked runs.
    pub title: Vec<InlineRun>,
    /// Dot leader connecting the title to the page number.
    pub leader: Option<String>,
    /// Content page number of the heading.
    pub page: Option<usize>,
}

impl TocEntry {
    /// Rendered title text without inline markers.
    pub fn title_text(&self) -> String {
        plain_text(&self.title)
    }

    /// Indentation, in characters, proportional to `level - 1`.
    pub fn indent(&self) -> usize {
        usize::from(self.level.saturating_sub(1)) * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::Emphasis;

    #[test]
    fn heading_helper_stamps_anchor_and_runs() {
        let block = ContentBlock::heading(2, "The **Big** Picture");
        let ContentBlock::Heading {
            level,
            runs,
            anchor,
            ..
        } = &block
        else {
            panic!("expected heading");
        };
        assert_eq!(*level, 2);
        assert_eq!(anchor.as_str(), "the_big_picture");
        assert_eq!(runs[1].emphasis(), Emphasis::Bold);
        assert!(block.is_heading());
    }

    #[test]
    fn title_detection_requires_level_one_exact_match() {
        let entry = HeadingOutlineEntry::new(1, "My Title");
        assert!(entry.is_title(Some("My Title")));
        assert!(!entry.is_title(Some("My title")));
        assert!(!entry.is_title(None));
        assert!(!HeadingOutlineEntry::new(2, "My Title").is_title(Some("My Title")));
    }

    #[test]
    fn non_heading_blocks_have_no_anchor() {
        assert!(ContentBlock::CodeBlock(vec!["x".into()]).anchor().is_none());
        assert!(ContentBlock::Paragraph(Vec::new()).anchor().is_none());
    }
}
