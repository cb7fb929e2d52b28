//! Structural markdown parser.
//!
//! The grammar is a fixed, line-oriented subset: ATX headings, bullet and numbered list items,
//! blockquotes, fenced code blocks and paragraphs. Anything unrecognised degrades to a paragraph,
//! so parsing never fails. Fence handling lives in [`FenceTracker`]; block classification only
//! sees lines outside a fence.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::metadata::{DocumentInfo, DocumentMetadata};
use crate::model::{ContentBlock, HeadingOutlineEntry};
use crate::richtext::resolve_inline;

/// Marker opening and closing a fenced code block.
pub const FENCE: &str = "```";

const MAX_HEADING_LEVEL: usize = 6;

/// A free-text line this long or longer is never taken as the subtitle.
const MAX_SUBTITLE_CHARS: usize = 100;

/// Output of [`parse`]: body blocks in source order and the heading outline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Renderable body blocks.
    pub blocks: Vec<ContentBlock>,
    /// One entry per emitted heading, in document order.
    pub outline: Vec<HeadingOutlineEntry>,
}

/// State of the fence state machine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum FenceState {
    #[default]
    Normal,
    InFence(Vec<String>),
}

/// What the fence state machine made of one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineEvent<'a> {
    /// The line is outside any fence and should be classified.
    Text(&'a str),
    /// The line opened a fence or was buffered inside one.
    Consumed,
    /// The line closed a fence; carries the buffered lines.
    Closed(Vec<String>),
}

/// Two-state machine tracking fenced code blocks.
///
/// In `Normal`, a line whose trimmed content starts with the fence marker opens a fence; any other
/// line is passed through. In `InFence`, lines are buffered verbatim until a fence line closes it.
#[derive(Debug, Default)]
pub struct FenceTracker {
    state: FenceState,
}

impl FenceTracker {
    /// Creates a tracker in the `Normal` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a fence is currently open.
    pub fn in_fence(&self) -> bool {
        matches!(self.state, FenceState::InFence(_))
    }

    /// Feeds one source line.
    pub fn feed<'a>(&mut self, line: &'a str) -> LineEvent<'a> {
        if !line.trim().starts_with(FENCE) {
            return match &mut self.state {
                FenceState::Normal => LineEvent::Text(line),
                FenceState::InFence(lines) => {
                    lines.push(line.to_owned());
                    LineEvent::Consumed
                }
            };
        }
        match std::mem::take(&mut self.state) {
            FenceState::Normal => {
                self.state = FenceState::InFence(Vec::new());
                LineEvent::Consumed
            }
            FenceState::InFence(lines) => LineEvent::Closed(lines),
        }
    }

    /// Ends the input, returning the lines of a fence left open.
    pub fn finish(self) -> Option<Vec<String>> {
        match self.state {
            FenceState::InFence(lines) => Some(lines),
            FenceState::Normal => None,
        }
    }
}

fn numbered_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)\.\s+(.*)$").expect("static list pattern is valid"))
}

/// Fills a missing title and subtitle of `document` from the body.
///
/// The title is the first level-1 heading. The subtitle is the first level-2 heading after that
/// heading, or the first non-heading line after it shorter than 100 characters. Lines inside code
/// fences are ignored and declared values are never replaced. A detected title is consumed by
/// [`parse`] like a declared one.
pub fn detect_document_info(body: &str, document: &mut DocumentInfo) {
    let mut fence = FenceTracker::new();
    let mut lines = body
        .lines()
        .filter_map(|line| match fence.feed(line) {
            LineEvent::Text(text) => Some(text.trim()),
            LineEvent::Consumed | LineEvent::Closed(_) => None,
        })
        .filter(|line| !line.is_empty());

    let Some(first_title) = lines.find_map(|line| match heading(line) {
        Some((1, text)) if !text.is_empty() => Some(text),
        _ => None,
    }) else {
        return;
    };
    if document.title.is_none() {
        debug!("Using first level-1 heading '{first_title}' as document title");
        document.title = Some(first_title.to_owned());
    }
    if document.subtitle.is_some() {
        return;
    }

    let subtitle = lines.find_map(|line| match heading(line) {
        Some((2, text)) if !text.is_empty() => Some(text),
        Some(_) => None,
        None if line.starts_with('#') => None,
        None => (line.chars().count() < MAX_SUBTITLE_CHARS).then_some(line),
    });
    if let Some(subtitle) = subtitle {
        debug!("Using '{subtitle}' as document subtitle");
        document.subtitle = Some(subtitle.to_owned());
    }
}

/// Parses the markdown body into content blocks and the heading outline.
///
/// A level-1 heading whose text equals the declared document title is consumed without producing a
/// block or an outline entry; the title is rendered on the title page instead.
pub fn parse(body: &str, metadata: &DocumentMetadata) -> ParsedDocument {
    let title = metadata.title().map(str::trim);
    let mut parsed = ParsedDocument::default();
    let mut fence = FenceTracker::new();

    for line in body.lines() {
        match fence.feed(line) {
            LineEvent::Text(text) => classify(text, title, &mut parsed),
            LineEvent::Consumed => {}
            LineEvent::Closed(lines) => push_code(lines, &mut parsed.blocks),
        }
    }
    if let Some(lines) = fence.finish() {
        debug!("Code fence left open at end of input; closing it");
        push_code(lines, &mut parsed.blocks);
    }

    debug!(
        "Parsed {} blocks, {} outline entries",
        parsed.blocks.len(),
        parsed.outline.len()
    );
    parsed
}

fn push_code(lines: Vec<String>, blocks: &mut Vec<ContentBlock>) {
    if !lines.is_empty() {
        blocks.push(ContentBlock::CodeBlock(lines));
    }
}

fn classify(line: &str, title: Option<&str>, parsed: &mut ParsedDocument) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    if let Some((level, text)) = heading(line) {
        if text.is_empty() || (level == 1 && title == Some(text)) {
            return;
        }
        parsed.blocks.push(ContentBlock::heading(level, text));
        parsed.outline.push(HeadingOutlineEntry::new(level, text));
        return;
    }

    let block = if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        ContentBlock::BulletItem(resolve_inline(item.trim()))
    } else if let Some(captures) = numbered_pattern().captures(line) {
        ContentBlock::NumberedItem {
            index: captures[1].to_owned(),
            runs: resolve_inline(&captures[2]),
        }
    } else if let Some(quoted) = line.strip_prefix('>') {
        let quoted = quoted.strip_prefix(' ').unwrap_or(quoted);
        ContentBlock::Quote(resolve_inline(quoted))
    } else {
        ContentBlock::Paragraph(resolve_inline(line))
    };
    parsed.blocks.push(block);
}

/// Splits an ATX heading into level and trimmed text. More than six `#` is not a heading.
fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|byte| *byte == b'#').count();
    if hashes == 0 || hashes > MAX_HEADING_LEVEL {
        return None;
    }
    let level = u8::try_from(hashes).ok()?;
    Some((level, line[hashes..].trim()))
}
