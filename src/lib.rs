//! Builds paginated PDF reports from markdown with YAML front matter.
//!
//! A report source is a YAML front matter block followed by a markdown body. The front matter is
//! validated into [`DocumentMetadata`], the body is parsed into [`ContentBlock`]s, and the
//! [`Assembler`] renders the document twice: once to measure where every heading lands and once
//! more with a table of contents carrying those page numbers.
//!
//! ```no_run
//! use proposal_pdf::{Assembler, GenpdfEngine};
//!
//! let mut assembler = Assembler::new(GenpdfEngine::new().with_logo("logo.png"));
//! let written = assembler.build_file("proposal.md".as_ref(), None)?;
//! println!("{}", written.display());
//! # Ok::<(), proposal_pdf::BuildError>(())
//! ```

pub mod anchor;
pub mod assembly;
pub mod builder;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod metadata;
pub mod model;
pub mod output;
pub mod parser;
pub mod render;
pub mod richtext;
pub mod signature;
pub mod style;
pub mod title_page;
pub mod toc;
pub mod tracking;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use anchor::AnchorName;
pub use assembly::{Assembler, BuildOptions, BuildOutput};
pub use error::{BuildError, RenderError, ResourceError, ValidationError};
pub use layout::{LayoutEngine, RenderFrame, RenderPass};
pub use metadata::DocumentMetadata;
pub use model::{ContentBlock, HeadingOutlineEntry, TocEntry};
pub use render::GenpdfEngine;
pub use tracking::{FrontMatterLayout, PageTracker, PageTrackingTable};
