//! The genpdf-backed layout engine.
//!
//! [`GenpdfEngine`] turns a [`RenderFrame`] into a PDF: title page, table-of-contents skeleton,
//! body, signatures. Page events reach the [`PageTracker`] through the page decorator configured
//! by [`DocumentBuilder`], heading placements through [`TrackedHeading`].

use std::io::Write;
use std::path::Path;

use genpdf::elements::{
    Break, FrameCellDecorator, LinearLayout, PageBreak, Paragraph, TableLayout,
};
use genpdf::error::Error;
use genpdf::fonts::{Font, FontData, FontFamily};
use genpdf::style::Style;
use genpdf::{Alignment, Element, Margins, PaperSize, Size};
use log::{debug, warn};

use crate::builder::DocumentBuilder;
use crate::elements::{
    decode_image_from_path, mm_from_f64, BodyMarker, BoxedElement, HorizontalRule, LogoImage,
    TocLine, TrackedHeading,
};
use crate::error::{RenderError, ResourceError};
use crate::fonts;
#[cfg(feature = "bookmarks")]
use crate::layout::RenderPass;
use crate::layout::{LayoutEngine, RenderFrame};
use crate::model::{ContentBlock, TocEntry};
use crate::richtext::{runs_to_spans, InlineRun};
use crate::signature::SignaturePlan;
use crate::style;
use crate::title_page::TitlePage;
use crate::tracking::{FrontMatterLayout, PageTracker};

const LOGO_WIDTH_MM: f64 = 40.0;
const FOOTER_HEIGHT_MM: f64 = 12.0;
const LINE_SPACING: f64 = 1.25;
const LIST_INDENT_MM: f64 = 5.0;
const QUOTE_INDENT_MM: f64 = 10.0;
const BLOCK_GAP_MM: f64 = 2.0;
const NO_BREAK_SPACE: char = '\u{a0}';
const TAB_WIDTH: usize = 4;

/// Layout engine rendering reports with genpdf.
pub struct GenpdfEngine {
    paper_size: Size,
    margins: Margins,
    font_family: Option<FontFamily<FontData>>,
    /// `None` until the monospace search ran.
    monospace_family: Option<Option<FontFamily<FontData>>>,
    logo: Option<image::DynamicImage>,
}

impl Default for GenpdfEngine {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4.into(),
            margins: Margins::trbl(30, 25, 25, 25),
            font_family: None,
            monospace_family: None,
            logo: None,
        }
    }
}

impl GenpdfEngine {
    /// Creates an engine with A4 paper and default margins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the paper size.
    pub fn with_paper_size(mut self, paper_size: impl Into<Size>) -> Self {
        self.paper_size = paper_size.into();
        self
    }

    /// Sets the page margins.
    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.margins = margins.into();
        self
    }

    /// Uses `family` instead of searching for the default fonts.
    pub fn with_font_family(mut self, family: FontFamily<FontData>) -> Self {
        self.font_family = Some(family);
        self
    }

    /// Sets code in `family` instead of searching for a monospace family.
    pub fn with_monospace_family(mut self, family: FontFamily<FontData>) -> Self {
        self.monospace_family = Some(Some(family));
        self
    }

    /// Places the image at `path` on the title page.
    ///
    /// A logo that cannot be read is reported as a warning and replaced by the research lab name.
    pub fn with_logo(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.logo = match decode_image_from_path(path) {
            Ok(image) => Some(image),
            Err(err) => {
                let err = ResourceError::Unavailable {
                    resource: path.display().to_string(),
                    reason: err.to_string(),
                };
                warn!("{err}; using the research lab name instead");
                None
            }
        };
        self
    }

    /// Returns whether a logo image is loaded.
    pub fn has_logo(&self) -> bool {
        self.logo.is_some()
    }

    fn font_family(&mut self) -> Result<FontFamily<FontData>, Error> {
        if let Some(family) = &self.font_family {
            return Ok(family.clone());
        }
        let family = fonts::default_font_family()?;
        self.font_family = Some(family.clone());
        Ok(family)
    }

    fn monospace_family(&mut self) -> Option<FontFamily<FontData>> {
        self.monospace_family
            .get_or_insert_with(fonts::monospace_font_family)
            .clone()
    }

    fn logo_element(&self, lab: &str) -> BoxedElement {
        let fallback = || {
            BoxedElement::new(
                Paragraph::new(lab.to_owned())
                    .aligned(Alignment::Center)
                    .styled(style::document_title_style()),
            )
        };
        let Some(image) = self.logo.clone() else {
            return fallback();
        };
        let mut caption = Paragraph::default();
        caption.push_styled(lab.to_owned(), style::footer_style());
        match LogoImage::new(image, caption, mm_from_f64(LOGO_WIDTH_MM)) {
            Ok(logo) => BoxedElement::new(logo),
            Err(err) => {
                warn!("Logo could not be embedded ({err}); using the research lab name instead");
                fallback()
            }
        }
    }

    fn title_page_element(&self, page: &TitlePage) -> Result<LinearLayout, Error> {
        let centered = |text: &str, style: Style| {
            Paragraph::new(text.to_owned())
                .aligned(Alignment::Center)
                .styled(style)
        };

        let mut layout = LinearLayout::vertical();
        layout.push(self.logo_element(&page.lab));
        layout.push(Break::new(1.5));
        layout.push(centered(&page.university, style::title_style()));
        layout.push(centered(
            &page.university_subtitle,
            style::document_title_style(),
        ));
        layout.push(Break::new(1.5));
        layout.push(HorizontalRule::new(0.6, style::PRIMARY));
        layout.push(Break::new(1.0));
        layout.push(centered(&page.document_type, style::document_title_style()));
        layout.push(Break::new(1.0));
        if let Some(title) = &page.title {
            layout.push(centered(title, style::title_style()));
            layout.push(Break::new(0.5));
        }
        if let Some(subtitle) = &page.subtitle {
            layout.push(centered(subtitle, Style::new().italic().with_font_size(14)));
            layout.push(Break::new(0.5));
        }
        layout.push(centered(
            &page.author_line,
            Style::new().italic().with_color(style::SECONDARY),
        ));
        layout.push(Break::new(1.5));

        let mut table = TableLayout::new(vec![1, 2]);
        table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
        for (label, value) in &page.rows {
            table
                .row()
                .element(
                    Paragraph::new(label.clone())
                        .styled(Style::new().bold().with_font_size(10))
                        .padded(Margins::trbl(1, 2, 1, 2)),
                )
                .element(
                    Paragraph::new(value.clone())
                        .styled(Style::new().with_font_size(10))
                        .padded(Margins::trbl(1, 2, 1, 2)),
                )
                .push()?;
        }
        layout.push(table);
        Ok(layout)
    }
}

impl LayoutEngine for GenpdfEngine {
    fn render(
        &mut self,
        frame: &RenderFrame<'_>,
        tracker: &PageTracker,
        sink: &mut dyn Write,
    ) -> Result<(), RenderError> {
        let family = self.font_family()?;
        let title_page = frame.title_page;
        let layout = frame.layout;
        let header_text = title_page.running_header().to_owned();
        let footer_left = title_page.footer_text();
        let footer_lab = title_page.lab.clone();

        let mut document = DocumentBuilder::new()
            .with_title(header_text.clone())
            .with_paper_size(self.paper_size)
            .with_margins(self.margins)
            .with_font_family(family)
            .with_page_tracker(tracker.clone())
            .with_plain_first_page(true)
            .with_header(move |_| header_element(&header_text))
            .with_footer(mm_from_f64(FOOTER_HEIGHT_MM), move |page| {
                footer_element(&footer_left, &footer_lab, layout, page)
            })
            .build()?;
        document.set_font_size(style::BODY_FONT_SIZE);
        document.set_line_spacing(LINE_SPACING);
        let monospace = self
            .monospace_family()
            .map(|family| document.add_font_family(family));
        let code = CodeStyles::new(monospace);

        document.push(self.title_page_element(title_page)?);
        push_front_matter(&mut document, layout, frame.toc, code);
        document.push(BodyMarker::new(tracker.clone()));
        for block in frame.body {
            document.push(block_element(block, Some(tracker), code));
        }
        if let Some(plan) = frame.signatures {
            document.push(signature_element(plan)?);
        }

        let mut bytes = Vec::new();
        document.render(&mut bytes)?;
        debug!(
            "{:?} pass rendered {} bytes over {} page(s)",
            frame.pass,
            bytes.len(),
            tracker.current_page()
        );

        #[cfg(feature = "bookmarks")]
        if frame.pass == RenderPass::Final {
            bytes = crate::bookmarks::apply_heading_destinations(
                &bytes,
                &outline_headings(frame.body),
                &tracker.snapshot(),
            )?;
        }

        sink.write_all(&bytes)?;
        Ok(())
    }
}

/// Code styles of one document; the monospace family is registered per document.
#[derive(Clone, Copy, Debug)]
struct CodeStyles {
    inline: Style,
    block: Style,
}

impl CodeStyles {
    fn new(monospace: Option<FontFamily<Font>>) -> Self {
        let mut inline = style::inline_code_style();
        let mut block = style::code_style();
        if let Some(family) = monospace {
            inline.set_font_family(family);
            block.set_font_family(family);
        }
        Self { inline, block }
    }
}

/// Pushes the table-of-contents skeleton between the title page and the body.
fn push_front_matter(
    document: &mut genpdf::Document,
    layout: FrontMatterLayout,
    toc: &[ContentBlock],
    code: CodeStyles,
) {
    match layout {
        FrontMatterLayout::TitleWithToc => document.push(Break::new(2.0)),
        FrontMatterLayout::SeparateToc | FrontMatterLayout::TitleOnly => {
            document.push(PageBreak::new())
        }
    }
    if layout.has_toc() {
        for block in toc {
            document.push(block_element(block, None, code));
        }
        document.push(PageBreak::new());
    }
}

fn paragraph_from_runs<'a>(
    prefix: Option<&str>,
    runs: impl IntoIterator<Item = &'a InlineRun>,
    base: Style,
    code: Style,
) -> Paragraph {
    let mut paragraph = Paragraph::default();
    if let Some(prefix) = prefix {
        paragraph.push_styled(prefix.to_owned(), base);
    }
    for run in runs {
        paragraph.push(run.to_styled_string(base, code));
    }
    paragraph
}

fn gap_below(left: f64) -> Margins {
    Margins::trbl(0, 0, mm_from_f64(BLOCK_GAP_MM), mm_from_f64(left))
}

/// Element for one content block. Headings report to `tracker` when one is given.
fn block_element(
    block: &ContentBlock,
    tracker: Option<&PageTracker>,
    code: CodeStyles,
) -> BoxedElement {
    let body = Style::new();
    match block {
        ContentBlock::Heading {
            level,
            runs,
            anchor,
            ..
        } => {
            let spacing = style::heading_spacing(*level);
            let paragraph =
                paragraph_from_runs(None, runs, style::heading_style(*level), code.inline);
            let margins = Margins::trbl(
                mm_from_f64(spacing.before),
                0,
                mm_from_f64(spacing.after),
                mm_from_f64(spacing.indent),
            );
            match tracker {
                Some(tracker) => BoxedElement::new(
                    TrackedHeading::new(paragraph, anchor.clone(), tracker.clone())
                        .padded(margins),
                ),
                None => BoxedElement::new(paragraph.padded(margins)),
            }
        }
        ContentBlock::Paragraph(runs) => {
            BoxedElement::new(
                paragraph_from_runs(None, runs, body, code.inline).padded(gap_below(0.0)),
            )
        }
        ContentBlock::BulletItem(runs) => BoxedElement::new(
            paragraph_from_runs(Some("\u{2022} "), runs, body, code.inline)
                .padded(gap_below(LIST_INDENT_MM)),
        ),
        ContentBlock::NumberedItem { index, runs } => BoxedElement::new(
            paragraph_from_runs(Some(&format!("{index}. ")), runs, body, code.inline)
                .padded(gap_below(LIST_INDENT_MM)),
        ),
        ContentBlock::Quote(runs) => BoxedElement::new(
            paragraph_from_runs(None, runs, style::quote_style(), code.inline)
                .padded(gap_below(QUOTE_INDENT_MM)),
        ),
        ContentBlock::CodeBlock(lines) => {
            let mut layout = LinearLayout::vertical();
            for line in lines {
                layout.push(Paragraph::new(code_line(line)).styled(code.block));
            }
            BoxedElement::new(
                layout
                    .padded(Margins::trbl(1, 2, 1, 2))
                    .framed()
                    .padded(gap_below(0.0)),
            )
        }
        ContentBlock::TocTitle(title) => BoxedElement::new(
            Paragraph::new(title.clone())
                .aligned(Alignment::Center)
                .styled(style::title_style())
                .padded(Margins::trbl(0, 0, 6, 0)),
        ),
        ContentBlock::TocEntry(entry) => {
            BoxedElement::new(toc_line(entry, code.inline).padded(Margins::trbl(0, 0, 1, 0)))
        }
    }
}

fn toc_line(entry: &TocEntry, code: Style) -> TocLine {
    let line = TocLine::new(
        runs_to_spans(&entry.title, style::toc_entry_style(entry.level), code),
        mm_from_f64(style::toc_indent(entry.level)),
    );
    match (&entry.leader, entry.page) {
        (Some(leader), Some(page)) => line.with_page(leader.clone(), page),
        _ => line,
    }
}

/// Replaces tabs with spaces up to the next tab stop.
fn expand_tabs(line: &str) -> String {
    let mut expanded = String::with_capacity(line.len());
    let mut column = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let width = TAB_WIDTH - column % TAB_WIDTH;
            expanded.extend(std::iter::repeat(' ').take(width));
            column += width;
        } else {
            expanded.push(ch);
            column += 1;
        }
    }
    expanded
}

/// Keeps leading indentation of code lines and the height of empty lines.
fn code_line(line: &str) -> String {
    let line = expand_tabs(line);
    let trimmed = line.trim_start_matches(' ');
    let indent = line.len() - trimmed.len();
    let mut text: String = std::iter::repeat(NO_BREAK_SPACE).take(indent).collect();
    text.push_str(trimmed);
    if text.is_empty() {
        text.push(NO_BREAK_SPACE);
    }
    text
}

fn header_element(text: &str) -> LinearLayout {
    let mut layout = LinearLayout::vertical();
    layout.push(
        Paragraph::new(text.to_owned())
            .aligned(Alignment::Right)
            .styled(style::footer_style()),
    );
    layout.push(HorizontalRule::new(1.0, style::SECONDARY));
    layout.push(Break::new(1.0));
    layout
}

/// Footer text for physical page `page`; body pages carry their content page number.
fn footer_line(lab: &str, layout: FrontMatterLayout, page: usize) -> String {
    if page > layout.front_pages() {
        format!("{lab} | Page {}", layout.content_page(page))
    } else {
        lab.to_owned()
    }
}

fn footer_element(
    university: &str,
    lab: &str,
    layout: FrontMatterLayout,
    page: usize,
) -> LinearLayout {
    let footer_style = style::footer_style();
    let mut footer = LinearLayout::vertical();
    footer.push(HorizontalRule::new(1.0, style::SECONDARY));
    footer.push(Paragraph::new(university.to_owned()).styled(footer_style));
    footer.push(
        Paragraph::new(footer_line(lab, layout, page))
            .aligned(Alignment::Right)
            .styled(footer_style),
    );
    footer
}

fn signature_element(plan: &SignaturePlan) -> Result<LinearLayout, Error> {
    let name_style = Style::new()
        .bold()
        .with_font_size(10)
        .with_color(style::PRIMARY);
    let date_style = Style::new().with_font_size(9).with_color(style::SECONDARY);
    let signature = |name: &str, alignment: Alignment, date: Option<&str>| {
        let mut cell = LinearLayout::vertical();
        cell.push(HorizontalRule::new(1.0, style::PRIMARY));
        cell.push(Break::new(0.5));
        cell.push(
            Paragraph::new(name.to_owned())
                .aligned(alignment)
                .styled(name_style),
        );
        if let Some(date) = date {
            cell.push(
                Paragraph::new(date.to_owned())
                    .aligned(alignment)
                    .styled(date_style),
            );
        }
        cell
    };

    let mut layout = LinearLayout::vertical();
    layout.push(Break::new(4.0));
    if plan.has_first_row() {
        let left = plan
            .author
            .as_ref()
            .map(|author| {
                signature(&author.name, Alignment::Left, Some(author.date.as_str()))
            })
            .unwrap_or_else(LinearLayout::vertical);
        let right = plan
            .supervisor
            .as_deref()
            .map(|name| signature(name, Alignment::Right, None))
            .unwrap_or_else(LinearLayout::vertical);
        let mut row = TableLayout::new(vec![5, 1, 5]);
        row.row()
            .element(left)
            .element(Break::new(0.0))
            .element(right)
            .push()?;
        layout.push(row);
    }
    if let Some(name) = &plan.co_supervisor {
        layout.push(Break::new(2.0));
        let mut row = TableLayout::new(vec![3, 2]);
        row.row()
            .element(Break::new(0.0))
            .element(signature(name, Alignment::Right, None))
            .push()?;
        layout.push(row);
    }
    layout.push(Break::new(2.0));
    Ok(layout)
}

#[cfg(feature = "bookmarks")]
fn outline_headings(body: &[ContentBlock]) -> Vec<crate::bookmarks::OutlineHeading> {
    body.iter()
        .filter_map(|block| match block {
            ContentBlock::Heading { runs, anchor, .. } => Some(crate::bookmarks::OutlineHeading {
                title: crate::richtext::plain_text(runs),
                anchor: anchor.clone(),
            }),
            _ => None,
        })
        .collect()
}
