//! Inline text runs and the inline-formatting pass.
//!
//! Every non-code line is split into [`InlineRun`] values before it becomes a content block.
//! The runs are an intermediary layer between the markdown grammar and the styled strings used by
//! [`genpdf`][genpdf]: bold, italic and inline code spans map to font styles and colours, and runs
//! that carry a link target are underlined by the table-of-contents element.
//!
//! The grammar is deliberately small. Three substitutions run in a fixed order (`**bold**`, then
//! `*italic*`, then `` `code` ``), each over the plain text left by the previous one. Nesting and
//! overlapping markers are not interpreted beyond that single pass.
//!
//! [genpdf]: https://docs.rs/genpdf/

use std::sync::OnceLock;

use genpdf::style::{Color, Style, StyledString};
use regex::Regex;

use crate::anchor::AnchorName;
use crate::style;

/// Inline emphasis of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Emphasis {
    /// Plain text.
    #[default]
    None,
    /// `**bold**`
    Bold,
    /// `*italic*`
    Italic,
    /// `` `code` ``
    Code,
}

/// A slice of text together with its inline emphasis and optional link target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineRun {
    text: String,
    emphasis: Emphasis,
    link: Option<AnchorName>,
}

impl InlineRun {
    /// Creates a run with the given emphasis.
    pub fn new(text: impl Into<String>, emphasis: Emphasis) -> Self {
        Self {
            text: text.into(),
            emphasis,
            link: None,
        }
    }

    /// Creates a plain run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Emphasis::None)
    }

    /// Returns the raw text contained in this run.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the emphasis of this run.
    pub fn emphasis(&self) -> Emphasis {
        self.emphasis
    }

    /// Returns the anchor this run links to, if any.
    pub fn link(&self) -> Option<&AnchorName> {
        self.link.as_ref()
    }

    /// Sets the link target and returns the updated run.
    pub fn linked(mut self, anchor: AnchorName) -> Self {
        self.link = Some(anchor);
        self
    }

    fn to_style(&self, code: Style) -> Style {
        let mut style = Style::new();
        match self.emphasis {
            Emphasis::None => {}
            Emphasis::Bold => style.set_bold(),
            Emphasis::Italic => style.set_italic(),
            Emphasis::Code => style.merge(code),
        }
        if self.link.is_some() {
            style.set_color(style::LINK);
        }
        style
    }

    /// Converts the run to a [`StyledString`], layering its emphasis over `base`.
    ///
    /// Code runs take `code` on top of `base`. The link underline is dropped at this layer; use
    /// [`StyledSpan`] when the element needs it.
    pub fn to_styled_string(&self, base: Style, code: Style) -> StyledString {
        StyledString::new(self.text.clone(), base.and(self.to_style(code)))
    }
}

/// A styled fragment ready for `genpdf` elements together with the underline flag.
#[derive(Clone, Debug)]
pub struct StyledSpan {
    /// The styled text fragment.
    pub string: StyledString,
    /// Whether the fragment should be rendered with an underline.
    pub underline: bool,
}

impl StyledSpan {
    /// Creates a new styled span.
    pub fn new(string: StyledString, underline: bool) -> Self {
        Self { string, underline }
    }

    /// Builds a span from `run`, underlining linked runs.
    pub fn from_run(run: &InlineRun, base: Style, code: Style) -> Self {
        Self::new(run.to_styled_string(base, code), run.link.is_some())
    }

    /// Colour used for the underline stroke, if any.
    pub fn color(&self) -> Option<Color> {
        self.string.style.color()
    }
}

/// Converts runs into styled spans over a common base style.
pub fn runs_to_spans<'a, I>(runs: I, base: Style, code: Style) -> Vec<StyledSpan>
where
    I: IntoIterator<Item = &'a InlineRun>,
{
    runs.into_iter()
        .map(|run| StyledSpan::from_run(run, base, code))
        .collect()
}

/// Concatenated text of `runs` without markers; used for measuring rendered length.
pub fn plain_text(runs: &[InlineRun]) -> String {
    runs.iter().map(InlineRun::text).collect()
}

fn bold_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("static bold pattern is valid"))
}

fn italic_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*(.*?)\*").expect("static italic pattern is valid"))
}

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"`(.*?)`").expect("static code pattern is valid"))
}

/// Resolves inline formatting of a single line into runs.
///
/// Plain text that matches none of the markers is returned as a single plain run. Empty marker
/// pairs (`****`, ` `` `) produce no run.
pub fn resolve_inline(text: &str) -> Vec<InlineRun> {
    let mut runs = vec![InlineRun::plain(text)];
    for (pattern, emphasis) in [
        (bold_pattern(), Emphasis::Bold),
        (italic_pattern(), Emphasis::Italic),
        (code_pattern(), Emphasis::Code),
    ] {
        runs = runs
            .into_iter()
            .flat_map(|run| match run.emphasis {
                Emphasis::None => split_plain(&run.text, pattern, emphasis),
                _ => vec![run],
            })
            .collect();
    }
    runs
}

fn split_plain(text: &str, pattern: &Regex, emphasis: Emphasis) -> Vec<InlineRun> {
    let mut runs = Vec::new();
    let mut cursor = 0;

    for captures in pattern.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        push_non_empty(&mut runs, &text[cursor..whole.start()], Emphasis::None);
        push_non_empty(&mut runs, inner.as_str(), emphasis);
        cursor = whole.end();
    }
    push_non_empty(&mut runs, &text[cursor..], Emphasis::None);

    runs
}

fn push_non_empty(runs: &mut Vec<InlineRun>, text: &str, emphasis: Emphasis) {
    if !text.is_empty() {
        runs.push(InlineRun::new(text, emphasis));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(runs: &[InlineRun]) -> Vec<(&str, Emphasis)> {
        runs.iter().map(|run| (run.text(), run.emphasis())).collect()
    }

    #[test]
    fn plain_text_is_single_run() {
        let runs = resolve_inline("Hello world");
        assert_eq!(shape(&runs), vec![("Hello world", Emphasis::None)]);
    }

    #[test]
    fn resolves_bold_italic_and_code() {
        let runs = resolve_inline("Hello **world**, *really* use `cargo`.");
        assert_eq!(
            shape(&runs),
            vec![
                ("Hello ", Emphasis::None),
                ("world", Emphasis::Bold),
                (", ", Emphasis::None),
                ("really", Emphasis::Italic),
                (" use ", Emphasis::None),
                ("cargo", Emphasis::Code),
                (".", Emphasis::None),
            ]
        );
    }

    #[test]
    fn bold_pass_runs_before_italic() {
        let runs = resolve_inline("**strong** and *soft*");
        assert_eq!(runs[0].emphasis(), Emphasis::Bold);
        assert_eq!(runs[0].text(), "strong");
        assert_eq!(runs[2].emphasis(), Emphasis::Italic);
    }

    #[test]
    fn unmatched_markers_stay_plain() {
        let runs = resolve_inline("2 * 3 = 6 and `open");
        assert_eq!(plain_text(&runs), "2 * 3 = 6 and `open");
        assert!(runs.iter().all(|run| run.emphasis() == Emphasis::None));
    }

    #[test]
    fn empty_marker_pairs_emit_nothing() {
        let runs = resolve_inline("a ** b");
        assert_eq!(plain_text(&runs), "a  b");
    }

    #[test]
    fn styled_string_reflects_emphasis() {
        let code = style::inline_code_style();
        let bold = InlineRun::new("Hello", Emphasis::Bold).to_styled_string(Style::new(), code);
        assert_eq!(bold.s, "Hello");
        assert!(bold.style.is_bold());
        assert_eq!(bold.style.color(), None);

        let italic =
            InlineRun::new("there", Emphasis::Italic).to_styled_string(Style::new(), code);
        assert!(italic.style.is_italic());
    }

    #[test]
    fn code_runs_take_the_code_style_over_the_base() {
        let base = Style::new().bold().with_font_size(14);
        let code = style::inline_code_style().with_font_size(9);
        let string = InlineRun::new("cargo", Emphasis::Code).to_styled_string(base, code);
        assert!(string.style.is_bold());
        assert_eq!(string.style.font_size(), 9);
        assert_eq!(string.style.color(), Some(style::CODE_TEXT));
    }

    #[test]
    fn linked_runs_are_underlined_and_coloured() {
        let run = InlineRun::plain("Intro").linked(AnchorName::from_heading("Intro"));
        let span = StyledSpan::from_run(&run, Style::new(), style::inline_code_style());
        assert!(span.underline);
        assert_eq!(span.color(), Some(style::LINK));
        assert_eq!(run.link().map(AnchorName::href).as_deref(), Some("#intro"));
    }
}
