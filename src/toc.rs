//! Table-of-contents resolution.
//!
//! The table of contents is emitted as ordinary [`ContentBlock`]s so both render passes draw it
//! through the same code path. The unnumbered form stands in for the real one during the
//! measurement pass; the numbered form carries page numbers read from the tracking table.

use log::{info, warn};

use crate::anchor::AnchorName;
use crate::metadata::DocumentMetadata;
use crate::model::{ContentBlock, HeadingOutlineEntry, TocEntry};
use crate::richtext::{resolve_inline, InlineRun};
use crate::tracking::PageTrackingTable;

/// Target width, in characters, of a numbered entry line.
pub const TOC_LINE_WIDTH: usize = 70;
/// Minimum number of leader dots.
pub const MIN_LEADER_DOTS: usize = 3;
/// Page number used for anchors missing from the tracking table.
pub const DEFAULT_PAGE: usize = 1;

/// Which form of the table of contents to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TocMode {
    /// Linked titles only; used for the measurement pass.
    Unnumbered,
    /// Linked titles with dot leaders and content page numbers.
    Numbered,
}

/// Builds the table-of-contents blocks for `outline`.
///
/// An empty outline yields no blocks at all. Entries equal to the document title are skipped.
/// In numbered mode, anchors absent from `table` get [`DEFAULT_PAGE`] and a warning.
pub fn resolve(
    outline: &[HeadingOutlineEntry],
    table: &PageTrackingTable,
    metadata: &DocumentMetadata,
    mode: TocMode,
) -> Vec<ContentBlock> {
    if outline.is_empty() {
        return Vec::new();
    }

    let title = metadata.title().map(str::trim);
    let mut blocks = Vec::with_capacity(outline.len() + 1);
    blocks.push(ContentBlock::TocTitle(
        metadata.table_labels.table_of_contents.clone(),
    ));

    for entry in outline.iter().filter(|entry| !entry.is_title(title)) {
        let mut toc_entry = TocEntry {
            level: entry.level,
            anchor: entry.anchor.clone(),
            title: linked_runs(&entry.text, &entry.anchor),
            leader: None,
            page: None,
        };
        if mode == TocMode::Numbered {
            let page = table.content_page(&entry.anchor).unwrap_or_else(|| {
                warn!(
                    "Heading '{}' was not observed while measuring; using page {DEFAULT_PAGE}",
                    entry.text
                );
                DEFAULT_PAGE
            });
            toc_entry.leader = Some(dot_leader(toc_entry.indent(), &toc_entry.title_text()));
            toc_entry.page = Some(page);
        }
        blocks.push(ContentBlock::TocEntry(toc_entry));
    }

    if mode == TocMode::Numbered {
        info!("Resolved table of contents with {} entries", blocks.len() - 1);
    }
    blocks
}

/// Outline anchors that `table` never observed, excluding the title entry.
pub fn tracking_gaps<'a>(
    outline: &'a [HeadingOutlineEntry],
    table: &PageTrackingTable,
    metadata: &DocumentMetadata,
) -> Vec<&'a AnchorName> {
    let title = metadata.title().map(str::trim);
    outline
        .iter()
        .filter(|entry| !entry.is_title(title))
        .filter(|entry| table.content_page(&entry.anchor).is_none())
        .map(|entry| &entry.anchor)
        .collect()
}

/// Dot leader filling the line after `indent` characters of indentation and `text`.
pub fn dot_leader(indent: usize, text: &str) -> String {
    let used = indent + text.chars().count();
    ".".repeat(TOC_LINE_WIDTH.saturating_sub(used).max(MIN_LEADER_DOTS))
}

fn linked_runs(text: &str, anchor: &AnchorName) -> Vec<InlineRun> {
    resolve_inline(text)
        .into_iter()
        .map(|run| run.linked(anchor.clone()))
        .collect()
}
