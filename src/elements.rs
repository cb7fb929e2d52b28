//! Custom genpdf elements used by the report renderer.
//!
//! Besides the logo and the table-of-contents line, this module holds the two elements that feed
//! the [`PageTracker`]: [`TrackedHeading`] reports where a heading is drawn and [`BodyMarker`]
//! reports where the body begins. Both rely on genpdf rendering elements in document order and
//! calling the page decorator before the first element of every page.

use std::ops::Range;
use std::path::Path;

use image::GenericImageView;

use genpdf::elements::{Image, Paragraph};
use genpdf::error::{Context as _, Error};
use genpdf::style::{Color, Style, StyledString};
use genpdf::{render, Alignment, Element, Mm, Position, RenderResult, Scale, Size};

use crate::anchor::AnchorName;
use crate::richtext::StyledSpan;
use crate::tracking::PageTracker;

const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const DEFAULT_CAPTION_SPACING_MM: f64 = 2.0;
const DEFAULT_UNDERLINE_OFFSET_MM: f64 = 0.4;
const PAGE_NUMBER_GAP_MM: f64 = 2.0;
const MIN_VISIBLE_DOTS: f64 = 3.0;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn estimated_image_size(image: &image::DynamicImage, dpi: f64) -> Size {
    let (px_width, px_height) = image.dimensions();
    let width_mm = MM_PER_INCH * (px_width as f64) / dpi;
    let height_mm = MM_PER_INCH * (px_height as f64) / dpi;
    Size::new(mm_from_f64(width_mm), mm_from_f64(height_mm))
}

/// Loads an image from the given path using the [`image`] crate with descriptive errors.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, Error> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .with_context(|| format!("Failed to open image file {}", path.display()))?;
    reader
        .with_guessed_format()
        .context("Unable to determine image format")?
        .decode()
        .with_context(|| format!("Failed to decode image file {}", path.display()))
}

/// An owned element trait object that can be pushed like any concrete element.
pub struct BoxedElement(Box<dyn Element>);

impl BoxedElement {
    /// Boxes `element`.
    pub fn new(element: impl Element + 'static) -> Self {
        Self(Box::new(element))
    }
}

impl Element for BoxedElement {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        self.0.render(context, area, style)
    }
}

/// The title-page logo with the research lab name centred underneath.
pub struct LogoImage {
    image: Image,
    caption: Paragraph,
    natural_size: Size,
    width: Mm,
    spacing: Mm,
}

impl LogoImage {
    /// Creates the logo from a decoded image, scaled to `width`.
    pub fn new(image: image::DynamicImage, caption: Paragraph, width: Mm) -> Result<Self, Error> {
        let natural_size = estimated_image_size(&image, DEFAULT_IMAGE_DPI);
        let mut logo = Self {
            image: Image::from_dynamic_image(image)?,
            caption,
            natural_size,
            width,
            spacing: mm_from_f64(DEFAULT_CAPTION_SPACING_MM),
        };
        logo.image.set_alignment(Alignment::Center);
        logo.caption.set_alignment(Alignment::Center);
        logo.apply_width();
        Ok(logo)
    }

    fn apply_width(&mut self) {
        let natural = mm_to_f64(self.natural_size.width);
        if natural > f64::EPSILON {
            let scale = mm_to_f64(self.width) / natural;
            self.image.set_scale(Scale::new(scale, scale));
        }
    }
}

impl Element for LogoImage {
    fn render(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let image_result = self.image.render(context, area.clone(), style)?;
        result.size = result.size.stack_vertical(image_result.size);
        result.has_more |= image_result.has_more;

        area.add_offset(Position::new(0, image_result.size.height + self.spacing));
        result.size = result.size.stack_vertical(Size::new(0, self.spacing));

        let caption_result = self.caption.render(context, area, style)?;
        result.size = result.size.stack_vertical(caption_result.size);
        result.has_more |= caption_result.has_more;

        Ok(result)
    }
}

/// Wraps a heading element and reports the page it is drawn on.
///
/// genpdf renders an element again on the next page when it did not fit; the heading is reported
/// the first time it produces visible output.
pub struct TrackedHeading<E> {
    inner: E,
    anchor: AnchorName,
    tracker: PageTracker,
    placed: bool,
}

impl<E: Element> TrackedHeading<E> {
    /// Wraps `inner`, reporting `anchor` to `tracker`.
    pub fn new(inner: E, anchor: AnchorName, tracker: PageTracker) -> Self {
        Self {
            inner,
            anchor,
            tracker,
            placed: false,
        }
    }
}

impl<E: Element> Element for TrackedHeading<E> {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let result = self.inner.render(context, area, style)?;
        if !self.placed && (result.size.height > Mm::default() || !result.has_more) {
            self.tracker.heading_placed(&self.anchor);
            self.placed = true;
        }
        Ok(result)
    }
}

/// Zero-sized element marking the start of the body.
pub struct BodyMarker {
    tracker: PageTracker,
}

impl BodyMarker {
    /// Creates a marker reporting to `tracker`.
    pub fn new(tracker: PageTracker) -> Self {
        Self { tracker }
    }
}

impl Element for BodyMarker {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        _area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        self.tracker.body_started();
        Ok(RenderResult::default())
    }
}

/// A horizontal stroke spanning a fraction of the available width, centred.
pub struct HorizontalRule {
    fraction: f64,
    color: Color,
    height: Mm,
}

impl HorizontalRule {
    /// Creates a rule covering `fraction` (0 to 1) of the width.
    pub fn new(fraction: f64, color: Color) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
            color,
            height: mm_from_f64(1.0),
        }
    }
}

impl Element for HorizontalRule {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        if self.height > area.size().height {
            result.has_more = true;
            return Ok(result);
        }
        let width = area.size().width;
        let length = mm_from_f64(mm_to_f64(width) * self.fraction);
        let start = (width - length) / 2.0;
        let y = self.height / 2.0;
        area.draw_line(
            vec![Position::new(start, y), Position::new(start + length, y)],
            Style::new().with_color(self.color),
        );
        result.size = Size::new(width, self.height);
        Ok(result)
    }
}

/// One line of the table of contents.
///
/// The linked title is drawn at `indent` and underlined, wrapping onto continuation lines when it
/// is wider than the area. When a page number is set, it is right-aligned on the last line and the
/// dot leader fills the gap before it, cut down to the space available.
pub struct TocLine {
    spans: Vec<StyledSpan>,
    indent: Mm,
    leader: Option<String>,
    page: Option<String>,
    underline_offset: Mm,
}

impl TocLine {
    /// Creates a line from the title spans.
    pub fn new(spans: Vec<StyledSpan>, indent: Mm) -> Self {
        Self {
            spans,
            indent,
            leader: None,
            page: None,
            underline_offset: mm_from_f64(DEFAULT_UNDERLINE_OFFSET_MM),
        }
    }

    /// Adds the dot leader and the page number.
    pub fn with_page(mut self, leader: impl Into<String>, page: usize) -> Self {
        self.leader = Some(leader.into());
        self.page = Some(page.to_string());
        self
    }
}

/// One word of a table-of-contents title, styled and measured.
struct TitleWord {
    text: String,
    style: Style,
    underline: bool,
    width: f64,
}

fn words_width(widths: &[f64], space: f64) -> f64 {
    let gaps = widths.len().saturating_sub(1) as f64;
    widths.iter().sum::<f64>() + space * gaps
}

fn fill_lines(widths: &[f64], words: Range<usize>, space: f64, limit: f64) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut start = words.start;
    let mut current = 0.0;
    for index in words.clone() {
        if index == start {
            current = widths[index];
            continue;
        }
        let extended = current + space + widths[index];
        if extended > limit {
            lines.push(start..index);
            start = index;
            current = widths[index];
        } else {
            current = extended;
        }
    }
    if start < words.end {
        lines.push(start..words.end);
    }
    lines
}

/// Breaks words of the given widths into lines of at most `limit`.
///
/// The last line additionally keeps `reserve` free for the leader and page number. A word wider
/// than a line gets a line of its own. An empty title still takes one line.
fn wrap_title(widths: &[f64], space: f64, limit: f64, reserve: f64) -> Vec<Range<usize>> {
    let mut lines = fill_lines(widths, 0..widths.len(), space, limit);
    match lines.pop() {
        Some(last) if words_width(&widths[last.clone()], space) > limit - reserve => {
            lines.extend(fill_lines(widths, last, space, limit - reserve));
        }
        Some(last) => lines.push(last),
        None => lines.push(0..0),
    }
    lines
}

impl TocLine {
    fn words(&self, style: Style, context: &genpdf::Context) -> Vec<TitleWord> {
        let mut words = Vec::new();
        for span in &self.spans {
            let word_style = style.and(span.string.style);
            for text in span.string.s.split_whitespace() {
                let width =
                    mm_to_f64(StyledString::new(text, word_style).width(&context.font_cache));
                words.push(TitleWord {
                    text: text.to_owned(),
                    style: word_style,
                    underline: span.underline,
                    width,
                });
            }
        }
        words
    }
}

impl Element for TocLine {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let words = self.words(style, context);
        let mut line_height = style.line_height(&context.font_cache);
        let mut glyph_height = Mm::default();
        for word in &words {
            line_height = line_height.max(word.style.line_height(&context.font_cache));
            glyph_height = glyph_height.max(
                word.style
                    .font(&context.font_cache)
                    .glyph_height(word.style.font_size()),
            );
        }

        let available = area.size().width;
        let gap = PAGE_NUMBER_GAP_MM;
        let dot_width = mm_to_f64(StyledString::new(".", style).width(&context.font_cache));
        let space = mm_to_f64(StyledString::new(" ", style).width(&context.font_cache));
        let page_string = self
            .page
            .as_ref()
            .map(|page| StyledString::new(page.clone(), style));
        let page_width = page_string
            .as_ref()
            .map_or(0.0, |page| mm_to_f64(page.width(&context.font_cache)));
        let reserve = if page_string.is_some() {
            page_width + 2.0 * gap + MIN_VISIBLE_DOTS * dot_width
        } else {
            0.0
        };

        let widths: Vec<f64> = words.iter().map(|word| word.width).collect();
        let title_limit = mm_to_f64(available) - mm_to_f64(self.indent);
        let lines = wrap_title(&widths, space, title_limit, reserve);

        let mut result = RenderResult::default();
        let height = mm_from_f64(mm_to_f64(line_height) * lines.len() as f64);
        if height > area.size().height {
            result.has_more = true;
            return Ok(result);
        }

        let mut last_line_end = mm_to_f64(self.indent);
        for (row, line) in lines.iter().enumerate() {
            let y = mm_from_f64(mm_to_f64(line_height) * row as f64);
            let Some(mut section) =
                area.text_section(&context.font_cache, Position::new(self.indent, y), style)
            else {
                result.has_more = true;
                return Ok(result);
            };

            let mut underlines = Vec::new();
            let mut cursor = mm_to_f64(self.indent);
            for (offset, word) in words[line.clone()].iter().enumerate() {
                if offset > 0 {
                    section.print_str(" ", style)?;
                    cursor += space;
                }
                section.print_str(&word.text, word.style)?;
                if word.underline {
                    underlines.push((cursor, cursor + word.width, word.style.color()));
                }
                cursor += word.width;
            }
            drop(section);

            let baseline = y + glyph_height + self.underline_offset;
            for (from, to, color) in underlines {
                let mut line_style = Style::new();
                if let Some(color) = color.or(style.color()) {
                    line_style = line_style.with_color(color);
                }
                area.draw_line(
                    vec![
                        Position::new(mm_from_f64(from), baseline),
                        Position::new(mm_from_f64(to), baseline),
                    ],
                    line_style,
                );
            }
            last_line_end = cursor;
        }

        if let Some(page_string) = &page_string {
            let y = mm_from_f64(mm_to_f64(line_height) * lines.len().saturating_sub(1) as f64);
            let page_x = mm_to_f64(available) - page_width;
            if let Some(mut section) = area.text_section(
                &context.font_cache,
                Position::new(mm_from_f64(page_x), y),
                style,
            ) {
                section.print_str(&page_string.s, style)?;
            }

            let leader = self.leader.as_deref().unwrap_or_default();
            let room = (page_x - gap) - (last_line_end + gap);
            if dot_width > f64::EPSILON && room > dot_width {
                let fitting = (room / dot_width).floor() as usize;
                let dots = &leader[..leader.len().min(fitting)];
                let leader_x = page_x - gap - dot_width * dots.len() as f64;
                if let Some(mut section) = area.text_section(
                    &context.font_cache,
                    Position::new(mm_from_f64(leader_x), y),
                    style,
                ) {
                    section.print_str(dots, style)?;
                }
            }
        }

        result.size = Size::new(available, height);
        Ok(result)
    }
}
