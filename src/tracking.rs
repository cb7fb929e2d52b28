//! Page tracking for the measurement pass.
//!
//! A [`PageTracker`] is handed to the layout engine for the duration of a pass. The engine reports
//! page starts and heading placements; the tracker translates physical pages into content pages
//! using the offset fixed by the [`FrontMatterLayout`] and records one position per anchor. After
//! the pass, [`PageTracker::snapshot`] copies the state into an immutable [`PageTrackingTable`].

use std::cell::RefCell;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, trace};

use crate::anchor::AnchorName;

/// Page-level skeleton of the front matter, fixed before the first pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrontMatterLayout {
    /// The table of contents shares page 1 with the title page.
    TitleWithToc,
    /// The table of contents gets its own page after the title page.
    SeparateToc,
    /// No table of contents; only the title page precedes the body.
    TitleOnly,
}

impl FrontMatterLayout {
    /// Decides the skeleton from configuration alone.
    pub fn plan(toc_on_title_page: bool, outline_is_empty: bool) -> Self {
        if outline_is_empty {
            Self::TitleOnly
        } else if toc_on_title_page {
            Self::TitleWithToc
        } else {
            Self::SeparateToc
        }
    }

    /// Number of pages preceding the body.
    pub fn front_pages(self) -> usize {
        match self {
            Self::TitleWithToc | Self::TitleOnly => 1,
            Self::SeparateToc => 2,
        }
    }

    /// Returns whether a table of contents is rendered at all.
    pub fn has_toc(self) -> bool {
        !matches!(self, Self::TitleOnly)
    }

    /// Physical page on which the body is expected to start.
    pub fn body_start_page(self) -> usize {
        self.front_pages() + 1
    }

    /// Translates a 1-based physical page number into a content page number, clamped to 1.
    pub fn content_page(self, physical: usize) -> usize {
        physical.saturating_sub(self.front_pages()).max(1)
    }
}

/// Where a heading was observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedPosition {
    /// 1-based physical page.
    pub physical: usize,
    /// 1-based content page.
    pub content: usize,
}

#[derive(Debug)]
struct TrackerState {
    layout: FrontMatterLayout,
    current_page: usize,
    body_start: Option<usize>,
    positions: BTreeMap<AnchorName, TrackedPosition>,
}

/// Shared handle collecting page events during one render pass.
///
/// Clones share the same state, so the page decorator and the heading elements of a genpdf
/// document can each hold one. The tracker is single-threaded and lives for one pass.
#[derive(Clone, Debug)]
pub struct PageTracker {
    state: Rc<RefCell<TrackerState>>,
}

impl PageTracker {
    /// Creates an empty tracker for a pass using `layout`.
    pub fn new(layout: FrontMatterLayout) -> Self {
        Self {
            state: Rc::new(RefCell::new(TrackerState {
                layout,
                current_page: 1,
                body_start: None,
                positions: BTreeMap::new(),
            })),
        }
    }

    /// Skeleton this tracker translates pages with.
    pub fn layout(&self) -> FrontMatterLayout {
        self.state.borrow().layout
    }

    /// Records that physical page `page` has begun.
    pub fn page_started(&self, page: usize) {
        trace!("Page {page} started");
        self.state.borrow_mut().current_page = page;
    }

    /// Current 1-based physical page.
    pub fn current_page(&self) -> usize {
        self.state.borrow().current_page
    }

    /// Records that the body begins on the current page. Only the first call counts.
    pub fn body_started(&self) {
        let mut state = self.state.borrow_mut();
        if state.body_start.is_none() {
            state.body_start = Some(state.current_page);
        }
    }

    /// Physical page the body started on, if the body was reached.
    pub fn body_start(&self) -> Option<usize> {
        self.state.borrow().body_start
    }

    /// Records that the heading with `anchor` was drawn on the current page.
    ///
    /// Returns its content page number. A later heading with the same anchor replaces the earlier
    /// position.
    pub fn heading_placed(&self, anchor: &AnchorName) -> usize {
        let mut state = self.state.borrow_mut();
        let physical = state.current_page;
        let position = TrackedPosition {
            physical,
            content: state.layout.content_page(physical),
        };
        debug!(
            "Heading '{anchor}' on physical page {physical}, content page {}",
            position.content
        );
        state.positions.insert(anchor.clone(), position);
        position.content
    }

    /// Copies the collected positions into an immutable table.
    pub fn snapshot(&self) -> PageTrackingTable {
        let state = self.state.borrow();
        PageTrackingTable {
            layout: state.layout,
            body_start: state.body_start,
            last_page: state.current_page,
            positions: state.positions.clone(),
        }
    }
}

/// Anchor positions observed during one render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageTrackingTable {
    layout: FrontMatterLayout,
    body_start: Option<usize>,
    last_page: usize,
    positions: BTreeMap<AnchorName, TrackedPosition>,
}

impl PageTrackingTable {
    /// Creates an empty table.
    pub fn new(layout: FrontMatterLayout) -> Self {
        Self {
            layout,
            body_start: None,
            last_page: 1,
            positions: BTreeMap::new(),
        }
    }

    /// Records `anchor` on physical page `physical`, replacing an earlier entry.
    pub fn record(&mut self, anchor: AnchorName, physical: usize) {
        let position = TrackedPosition {
            physical,
            content: self.layout.content_page(physical),
        };
        self.last_page = self.last_page.max(physical);
        self.positions.insert(anchor, position);
    }

    /// Skeleton the table was recorded with.
    pub fn layout(&self) -> FrontMatterLayout {
        self.layout
    }

    /// Content page of `anchor`, if it was observed.
    pub fn content_page(&self, anchor: &AnchorName) -> Option<usize> {
        self.positions.get(anchor).map(|position| position.content)
    }

    /// Physical page of `anchor`, if it was observed.
    pub fn physical_page(&self, anchor: &AnchorName) -> Option<usize> {
        self.positions.get(anchor).map(|position| position.physical)
    }

    /// Physical page the body started on.
    pub fn body_start(&self) -> Option<usize> {
        self.body_start
    }

    /// Last physical page seen during the pass.
    pub fn page_count(&self) -> usize {
        self.last_page
    }

    /// Number of distinct anchors observed.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns whether no anchor was observed.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterates over anchors in lexical order.
    pub fn iter(&self) -> btree_map::Iter<'_, AnchorName, TrackedPosition> {
        self.positions.iter()
    }

    /// Returns the physical page the body actually started on when the front matter ran past its
    /// skeleton.
    pub fn front_matter_overflow(&self) -> Option<usize> {
        self.body_start
            .filter(|start| *start > self.layout.body_start_page())
    }

    /// Anchors whose content page differs in `other`, as `(anchor, ours, theirs)`.
    pub fn drift<'a>(&'a self, other: &PageTrackingTable) -> Vec<(&'a AnchorName, usize, usize)> {
        self.positions
            .iter()
            .filter_map(|(anchor, position)| {
                let theirs = other.content_page(anchor)?;
                (theirs != position.content).then_some((anchor, position.content, theirs))
            })
            .collect()
    }
}
