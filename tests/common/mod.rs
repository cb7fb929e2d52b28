#![allow(dead_code)]

use std::collections::HashSet;
use std::io::Write;

use proposal_pdf::{
    AnchorName, ContentBlock, FrontMatterLayout, LayoutEngine, PageTracker, RenderError,
    RenderFrame, RenderPass,
};

const TITLE_PAGE_LINES: usize = 12;
const SIGNATURE_LINES: usize = 4;

/// A pass as the engine received it.
#[derive(Clone, Debug)]
pub struct RecordedFrame {
    pub pass: RenderPass,
    pub layout: FrontMatterLayout,
    pub toc: Vec<ContentBlock>,
    pub body: Vec<ContentBlock>,
    pub has_signatures: bool,
}

/// Deterministic layout engine paginating by a fixed number of lines per page.
///
/// Headings take two lines, code blocks one line per source line, every other block one line.
/// A block that does not fit on the current page moves to the next one.
pub struct LineBudgetEngine {
    pub lines_per_page: usize,
    pub fail_on: Option<RenderPass>,
    /// Headings with these anchors are drawn but never reported.
    pub unreported: HashSet<AnchorName>,
    pub frames: Vec<RecordedFrame>,
}

impl LineBudgetEngine {
    pub fn new(lines_per_page: usize) -> Self {
        Self {
            lines_per_page,
            fail_on: None,
            unreported: HashSet::new(),
            frames: Vec::new(),
        }
    }

    pub fn failing_on(mut self, pass: RenderPass) -> Self {
        self.fail_on = Some(pass);
        self
    }

    pub fn without_reporting(mut self, heading: &str) -> Self {
        self.unreported.insert(AnchorName::from_heading(heading));
        self
    }

    pub fn frame(&self, pass: RenderPass) -> &RecordedFrame {
        self.frames
            .iter()
            .find(|frame| frame.pass == pass)
            .expect("pass was rendered")
    }
}

struct Cursor<'a> {
    tracker: &'a PageTracker,
    budget: usize,
    page: usize,
    used: usize,
}

impl<'a> Cursor<'a> {
    fn start(tracker: &'a PageTracker, budget: usize) -> Self {
        tracker.page_started(1);
        Self {
            tracker,
            budget,
            page: 1,
            used: 0,
        }
    }

    fn page_break(&mut self) {
        self.page += 1;
        self.used = 0;
        self.tracker.page_started(self.page);
    }

    fn take(&mut self, lines: usize) {
        if self.used > 0 && self.used + lines > self.budget {
            self.page_break();
        }
        self.used += lines;
    }
}

fn block_lines(block: &ContentBlock) -> usize {
    match block {
        ContentBlock::Heading { .. } | ContentBlock::TocTitle(_) => 2,
        ContentBlock::CodeBlock(lines) => lines.len().max(1),
        ContentBlock::Paragraph(_)
        | ContentBlock::BulletItem(_)
        | ContentBlock::NumberedItem { .. }
        | ContentBlock::Quote(_)
        | ContentBlock::TocEntry(_) => 1,
    }
}

impl LayoutEngine for LineBudgetEngine {
    fn render(
        &mut self,
        frame: &RenderFrame<'_>,
        tracker: &PageTracker,
        sink: &mut dyn Write,
    ) -> Result<(), RenderError> {
        self.frames.push(RecordedFrame {
            pass: frame.pass,
            layout: frame.layout,
            toc: frame.toc.to_vec(),
            body: frame.body.to_vec(),
            has_signatures: frame.signatures.is_some(),
        });

        let mut cursor = Cursor::start(tracker, self.lines_per_page);
        cursor.take(TITLE_PAGE_LINES);
        match frame.layout {
            FrontMatterLayout::TitleWithToc => {
                frame.toc.iter().for_each(|block| cursor.take(block_lines(block)));
                cursor.page_break();
            }
            FrontMatterLayout::SeparateToc => {
                cursor.page_break();
                frame.toc.iter().for_each(|block| cursor.take(block_lines(block)));
                cursor.page_break();
            }
            FrontMatterLayout::TitleOnly => cursor.page_break(),
        }

        tracker.body_started();
        for block in frame.body {
            cursor.take(block_lines(block));
            if let ContentBlock::Heading { anchor, .. } = block {
                if !self.unreported.contains(anchor) {
                    tracker.heading_placed(anchor);
                }
            }
        }
        if frame.signatures.is_some() {
            cursor.take(SIGNATURE_LINES);
        }

        write!(sink, "{:?} pages={}", frame.pass, cursor.page)?;
        if self.fail_on == Some(frame.pass) {
            return Err(RenderError::Engine(format!(
                "{:?} pass failed on purpose",
                frame.pass
            )));
        }
        Ok(())
    }
}

/// Front matter with every required field; `document` lines are appended verbatim.
pub fn front_matter(document_extra: &str) -> String {
    format!(
        "---
student:
  name: Jane Doe
  student_id: 204711
  program: Software Engineering
  specialization: Distributed Systems
  supervisor: Prof. Dr. Smith
  co_supervisor: Dr. Miller
  academic_year: 2024/25
document:
  type: Research Proposal
  submission_date: March 2025
{document_extra}university:
  name: Heilbronn University
  subtitle: of Applied Sciences
  faculty: Computer Science
---
"
    )
}

/// Complete source with a declared title, `toc_on_title_page` set and the given body.
pub fn source(toc_on_title_page: bool, body: &str) -> String {
    format!(
        "{}{body}",
        front_matter(&format!(
            "  title: Research Proposal Draft\n  toc_on_title_page: {toc_on_title_page}\n"
        ))
    )
}

/// Headings of `blocks` as `(level, text)`.
pub fn headings(blocks: &[ContentBlock]) -> Vec<(u8, &str)> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Heading { level, text, .. } => Some((*level, text.as_str())),
            _ => None,
        })
        .collect()
}

/// Table-of-contents entries of `blocks`.
pub fn toc_entries(blocks: &[ContentBlock]) -> Vec<&proposal_pdf::TocEntry> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::TocEntry(entry) => Some(entry),
            _ => None,
        })
        .collect()
}
