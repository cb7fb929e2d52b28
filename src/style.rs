//! Palette and dynamic text styles.
//!
//! Heading and table-of-contents styles are derived from the heading level so deeper levels get
//! smaller type, tighter spacing and more indentation.

use genpdf::style::{Color, Style};

/// Dark blue used for headings, rules and signature names.
pub const PRIMARY: Color = Color::Rgb(0, 51, 102);
/// Grey used for secondary text such as quotes and footers.
pub const SECONDARY: Color = Color::Rgb(153, 153, 153);
/// Bright blue used for the document title.
pub const ACCENT: Color = Color::Rgb(0, 102, 204);
/// Link colour in the table of contents.
pub const LINK: Color = Color::Rgb(0, 76, 153);
/// Colour of inline code and code blocks.
pub const CODE_TEXT: Color = Color::Rgb(70, 70, 70);

const HEADING_SIZES: [u8; 6] = [20, 16, 14, 12, 11, 10];
const TOC_SIZES: [u8; 6] = [11, 11, 10, 10, 9, 9];
const MM_PER_POINT: f64 = 0.3528;

/// Base font size of body text.
pub const BODY_FONT_SIZE: u8 = 11;
/// Font size of code blocks.
pub const CODE_FONT_SIZE: u8 = 9;
/// Font size of the running header and footer.
pub const FOOTER_FONT_SIZE: u8 = 7;

fn level_index(level: u8) -> usize {
    usize::from(level.clamp(1, 6) - 1)
}

/// Converts typographic points to millimetres.
pub fn pt_to_mm(points: f64) -> f64 {
    points * MM_PER_POINT
}

/// Spacing of a heading level, in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadingSpacing {
    /// Space above the heading.
    pub before: f64,
    /// Space below the heading.
    pub after: f64,
    /// Left indentation.
    pub indent: f64,
}

/// Text style of a heading.
pub fn heading_style(level: u8) -> Style {
    Style::new()
        .bold()
        .with_font_size(HEADING_SIZES[level_index(level)])
        .with_color(PRIMARY)
}

/// Spacing around a heading.
pub fn heading_spacing(level: u8) -> HeadingSpacing {
    let step = level_index(level) as f64;
    HeadingSpacing {
        before: pt_to_mm(20.0 - step * 2.0),
        after: pt_to_mm(12.0 - step),
        indent: pt_to_mm(step * 10.0),
    }
}

/// Text style of a table-of-contents entry.
pub fn toc_entry_style(level: u8) -> Style {
    let color = if level <= 2 { PRIMARY } else { SECONDARY };
    Style::new()
        .with_font_size(TOC_SIZES[level_index(level)])
        .with_color(color)
}

/// Left indentation of a table-of-contents entry, in millimetres.
pub fn toc_indent(level: u8) -> f64 {
    pt_to_mm(level_index(level) as f64 * 20.0)
}

/// Style of the "Table of Contents" title and other large centred titles.
pub fn title_style() -> Style {
    Style::new().bold().with_font_size(18).with_color(ACCENT)
}

/// Style of centred secondary headings on the title page.
pub fn document_title_style() -> Style {
    Style::new().bold().with_font_size(16).with_color(SECONDARY)
}

/// Style of quotes.
pub fn quote_style() -> Style {
    Style::new().italic().with_color(SECONDARY)
}

/// Style of inline code runs.
pub fn inline_code_style() -> Style {
    Style::new().with_color(CODE_TEXT)
}

/// Style of code block lines.
pub fn code_style() -> Style {
    Style::new()
        .with_font_size(CODE_FONT_SIZE)
        .with_color(CODE_TEXT)
}

/// Style of header and footer lines.
pub fn footer_style() -> Style {
    Style::new()
        .with_font_size(FOOTER_FONT_SIZE)
        .with_color(SECONDARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_sizes_shrink_with_level() {
        let sizes: Vec<u8> = (1..=6).map(|level| heading_style(level).font_size()).collect();
        assert!(sizes.windows(2).all(|pair| pair[0] >= pair[1]));
        assert_eq!(sizes[0], 20);
    }

    #[test]
    fn deeper_headings_indent_further() {
        assert!(heading_spacing(3).indent > heading_spacing(2).indent);
        assert_eq!(heading_spacing(1).indent, 0.0);
    }

    #[test]
    fn out_of_range_levels_are_clamped() {
        assert_eq!(heading_style(0).font_size(), heading_style(1).font_size());
        assert_eq!(heading_style(9).font_size(), heading_style(6).font_size());
    }

    #[test]
    fn toc_colours_follow_level() {
        assert_eq!(toc_entry_style(1).color(), Some(PRIMARY));
        assert_eq!(toc_entry_style(3).color(), Some(SECONDARY));
    }
}
