//! Two-pass document assembly.
//!
//! Page numbers in the table of contents depend on the final layout, and the final layout depends
//! on how much room the table of contents takes. [`Assembler`] breaks the cycle in three steps:
//!
//! 1. Fix the front-matter skeleton from configuration ([`FrontMatterLayout::plan`]), so the number
//!    of pages before the body is known before anything is drawn.
//! 2. Render a measurement pass with an unnumbered stand-in table of contents into a scratch file
//!    and record the page every heading lands on.
//! 3. Resolve the numbered table of contents from those observations and render the final pass
//!    with the very same body blocks.
//!
//! The body is parsed exactly once and both passes borrow the same blocks, so headings cannot move
//! between passes because of the body itself.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tempfile::Builder;

use crate::anchor::AnchorName;
use crate::error::BuildError;
use crate::layout::{LayoutEngine, RenderFrame, RenderPass};
use crate::metadata::{self, DocumentMetadata};
use crate::model::{ContentBlock, HeadingOutlineEntry};
use crate::output;
use crate::parser;
use crate::signature::{self, SignaturePlan};
use crate::title_page::TitlePage;
use crate::toc::{self, TocMode};
use crate::tracking::{FrontMatterLayout, PageTracker, PageTrackingTable};

/// Options of a build. All have defaults.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    scratch_dir: Option<PathBuf>,
    signature_date: Option<String>,
    output_prefix: String,
    detect_title: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            signature_date: None,
            output_prefix: output::DEFAULT_PREFIX.to_owned(),
            detect_title: true,
        }
    }
}

impl BuildOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory receiving the measurement-pass scratch file. Defaults to the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Fixes the date printed under the author's signature. Defaults to today.
    pub fn with_signature_date(mut self, date: impl Into<String>) -> Self {
        self.signature_date = Some(date.into());
        self
    }

    /// File name prefix used when the output path is derived from the input.
    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    /// Whether a missing title and subtitle are taken from the body. Enabled by default.
    pub fn with_title_detection(mut self, enabled: bool) -> Self {
        self.detect_title = enabled;
        self
    }
}

/// Result of a successful build.
#[derive(Clone, Debug)]
pub struct BuildOutput {
    /// The final document.
    pub bytes: Vec<u8>,
    /// Validated front matter, with a detected title and subtitle filled in.
    pub metadata: DocumentMetadata,
    /// Front-matter skeleton both passes used.
    pub layout: FrontMatterLayout,
    /// Heading outline of the body.
    pub outline: Vec<HeadingOutlineEntry>,
    /// Resolved table of contents as rendered in the final pass.
    pub toc: Vec<ContentBlock>,
    /// Positions observed during the measurement pass.
    pub measured: PageTrackingTable,
    /// Positions observed during the final pass.
    pub rendered: PageTrackingTable,
    /// Outline anchors the measurement pass never observed.
    pub tracking_gaps: Vec<AnchorName>,
}

/// Runs the two-pass build on top of a [`LayoutEngine`].
#[derive(Debug)]
pub struct Assembler<E> {
    engine: E,
    options: BuildOptions,
}

impl<E: LayoutEngine> Assembler<E> {
    /// Creates an assembler with default options.
    pub fn new(engine: E) -> Self {
        Self::with_options(engine, BuildOptions::default())
    }

    /// Creates an assembler with explicit options.
    pub fn with_options(engine: E, options: BuildOptions) -> Self {
        Self { engine, options }
    }

    /// Builds the document described by `source` (front matter followed by markdown).
    ///
    /// The front matter is validated before anything is rendered.
    pub fn build(&mut self, source: &str) -> Result<BuildOutput, BuildError> {
        let (metadata, body) = metadata::from_source(source)?;
        self.build_document(metadata, &body)
    }

    /// Builds the document from already validated front matter and the markdown body.
    pub fn build_document(
        &mut self,
        mut metadata: DocumentMetadata,
        body: &str,
    ) -> Result<BuildOutput, BuildError> {
        if self.options.detect_title {
            parser::detect_document_info(body, &mut metadata.document);
        }
        let parsed = parser::parse(body, &metadata);
        let layout = FrontMatterLayout::plan(
            metadata.document.toc_on_title_page,
            parsed.outline.is_empty(),
        );
        debug!(
            "Front matter layout {layout:?} ({} page(s) before the body)",
            layout.front_pages()
        );

        let title_page = TitlePage::compose(&metadata);
        let date = self
            .options
            .signature_date
            .clone()
            .unwrap_or_else(signature::today);
        let signatures = SignaturePlan::from_metadata(&metadata, &date);

        let stand_in = toc::resolve(
            &parsed.outline,
            &PageTrackingTable::new(layout),
            &metadata,
            TocMode::Unnumbered,
        );
        let mut frame = RenderFrame {
            pass: RenderPass::Measure,
            layout,
            title_page: &title_page,
            toc: &stand_in,
            body: &parsed.blocks,
            signatures: signatures.as_ref(),
        };

        info!("Measuring page positions of {} headings", parsed.outline.len());
        let measured = self.measure(&frame)?;
        if let Some(start) = measured.front_matter_overflow() {
            warn!(
                "Front matter ran past its skeleton: body starts on page {start} instead of {}",
                layout.body_start_page()
            );
        }
        let tracking_gaps: Vec<AnchorName> = toc::tracking_gaps(&parsed.outline, &measured, &metadata)
            .into_iter()
            .cloned()
            .collect();

        let resolved = toc::resolve(&parsed.outline, &measured, &metadata, TocMode::Numbered);
        frame.pass = RenderPass::Final;
        frame.toc = &resolved;

        info!("Rendering final document");
        let tracker = PageTracker::new(layout);
        let mut bytes = Vec::new();
        self.engine.render(&frame, &tracker, &mut bytes)?;
        let rendered = tracker.snapshot();
        for (anchor, measured_page, rendered_page) in measured.drift(&rendered) {
            warn!(
                "Heading '{anchor}' moved from page {measured_page} to {rendered_page} in the final pass"
            );
        }
        info!(
            "Rendered {} page(s), {} bytes",
            rendered.page_count(),
            bytes.len()
        );

        Ok(BuildOutput {
            bytes,
            layout,
            outline: parsed.outline,
            toc: resolved,
            measured,
            rendered,
            tracking_gaps,
            metadata,
        })
    }

    /// Builds `input` and writes the document to the resolved output path, returning that path.
    ///
    /// Nothing is written unless both passes succeed.
    pub fn build_file(
        &mut self,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<PathBuf, BuildError> {
        if !input.is_file() {
            return Err(BuildError::InputNotFound(input.to_path_buf()));
        }
        let source = fs::read_to_string(input)?;
        info!("Building {}", input.display());
        let built = self.build(&source)?;

        let target = output::resolve_output_path(input, output, &self.options.output_prefix);
        output::write_atomically(&target, &built.bytes)?;
        info!("PDF written to {}", target.display());
        Ok(target)
    }

    /// Renders the measurement pass into a scratch file and returns the observed positions.
    ///
    /// The scratch file is removed when this returns, whether the pass succeeded or not.
    fn measure(&mut self, frame: &RenderFrame<'_>) -> Result<PageTrackingTable, BuildError> {
        let mut scratch = self.scratch_file()?;
        debug!("Measurement pass writes to {}", scratch.path().display());

        let tracker = PageTracker::new(frame.layout);
        self.engine.render(frame, &tracker, scratch.as_file_mut())?;
        scratch.close()?;

        let measured = tracker.snapshot();
        debug!(
            "Measured {} anchors over {} page(s)",
            measured.len(),
            measured.page_count()
        );
        Ok(measured)
    }

    fn scratch_file(&self) -> io::Result<tempfile::NamedTempFile> {
        let mut builder = Builder::new();
        builder.prefix("measure-").suffix(".pdf");
        match &self.options.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}
