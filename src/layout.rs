//! Contract between the assembly pipeline and a layout engine.
//!
//! The pipeline never draws anything itself. It hands a [`RenderFrame`] to a [`LayoutEngine`]
//! together with a [`PageTracker`], and the engine reports page starts and heading placements
//! while it lays the frame out. [`GenpdfEngine`](crate::render::GenpdfEngine) is the production
//! implementation; tests drive the pipeline with deterministic fakes.

use std::io::Write;

use crate::error::RenderError;
use crate::model::ContentBlock;
use crate::signature::SignaturePlan;
use crate::title_page::TitlePage;
use crate::tracking::{FrontMatterLayout, PageTracker};

/// Which of the two passes is being rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPass {
    /// Discarded pass that measures where headings land.
    Measure,
    /// Pass producing the delivered document.
    Final,
}

/// Everything one pass renders.
///
/// The body, title page and signature plan are shared by reference between passes; only `toc`
/// and `pass` differ.
#[derive(Clone, Copy, Debug)]
pub struct RenderFrame<'a> {
    pub pass: RenderPass,
    /// Front-matter skeleton fixed before the first pass.
    pub layout: FrontMatterLayout,
    pub title_page: &'a TitlePage,
    /// Table-of-contents blocks; empty when `layout` has no table of contents.
    pub toc: &'a [ContentBlock],
    /// Body blocks in document order.
    pub body: &'a [ContentBlock],
    pub signatures: Option<&'a SignaturePlan>,
}

/// A layout engine able to paginate a [`RenderFrame`].
///
/// Implementations must:
/// - call [`PageTracker::page_started`] whenever a physical page begins, starting with page 1;
/// - call [`PageTracker::body_started`] on the page where the first body block is placed;
/// - call [`PageTracker::heading_placed`] for every heading block, in document order, on the page
///   the heading is drawn on;
/// - lay the front matter out according to `frame.layout`: title page, then the table of contents
///   either on the same page or on a page of its own, then the body on a fresh page.
///
/// The finished document is written to `sink`.
pub trait LayoutEngine {
    /// Lays out and writes one pass.
    fn render(
        &mut self,
        frame: &RenderFrame<'_>,
        tracker: &PageTracker,
        sink: &mut dyn Write,
    ) -> Result<(), RenderError>;
}

impl<E: LayoutEngine + ?Sized> LayoutEngine for &mut E {
    fn render(
        &mut self,
        frame: &RenderFrame<'_>,
        tracker: &PageTracker,
        sink: &mut dyn Write,
    ) -> Result<(), RenderError> {
        (**self).render(frame, tracker, sink)
    }
}

impl<E: LayoutEngine + ?Sized> LayoutEngine for Box<E> {
    fn render(
        &mut self,
        frame: &RenderFrame<'_>,
        tracker: &PageTracker,
        sink: &mut dyn Write,
    ) -> Result<(), RenderError> {
        (**self).render(frame, tracker, sink)
    }
}
