//! In-document navigation added to the final PDF with `lopdf`.
//!
//! genpdf has no notion of links or outlines, so the rendered bytes are post-processed: every
//! tracked heading gets a named destination under its anchor (so `#intro` resolves inside the
//! file) and an entry in a flat document outline.

use std::collections::BTreeMap;

use log::debug;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use thiserror::Error;

use crate::anchor::AnchorName;
use crate::tracking::PageTrackingTable;

/// Errors that can occur while embedding navigation data into a rendered PDF document.
#[derive(Error, Debug)]
pub enum BookmarkError {
    /// The PDF bytes could not be parsed or written by `lopdf`.
    #[error("failed to process PDF bytes: {0}")]
    Pdf(#[from] lopdf::Error),
    /// Writing the updated document failed.
    #[error("failed to write PDF bytes: {0}")]
    Io(#[from] std::io::Error),
    /// A required catalog entry was missing from the document trailer.
    #[error("PDF catalog entry is missing")]
    MissingCatalog,
    /// The catalog object was not a dictionary, preventing outline injection.
    #[error("PDF catalog entry is not a dictionary")]
    InvalidCatalog,
    /// A tracked page number did not exist in the rendered document.
    #[error("heading '{anchor}' refers to missing page {page_number}")]
    MissingPage {
        /// Anchor of the heading.
        anchor: AnchorName,
        /// The requested (1-indexed) page number that could not be resolved.
        page_number: usize,
    },
}

/// A heading to expose in the outline: display title and anchor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlineHeading {
    pub title: String,
    pub anchor: AnchorName,
}

/// Adds named destinations and a flat outline for `headings` to `pdf_bytes`.
///
/// Pages are taken from `table`, which must have been recorded while rendering these bytes.
/// Headings missing from `table` are left out. Returns the input unchanged when nothing was
/// tracked.
pub fn apply_heading_destinations(
    pdf_bytes: &[u8],
    headings: &[OutlineHeading],
    table: &PageTrackingTable,
) -> Result<Vec<u8>, BookmarkError> {
    if table.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }
    let mut document = Document::load_mem(pdf_bytes)?;
    let pages = document.get_pages();

    let mut outline_entries = collect_outline_entries(&mut document, headings, table, &pages)?;
    if outline_entries.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let destinations: BTreeMap<&AnchorName, ObjectId> = outline_entries
        .iter()
        .map(|entry| (&entry.anchor, entry.page_ref))
        .collect();
    let names = destination_names(&destinations);
    let linked = destinations.len();

    let outlines_id = document.new_object_id();
    link_outline_entries(outlines_id, &mut document, &mut outline_entries);
    update_catalog(outlines_id, &mut document, &outline_entries, names)?;
    debug!(
        "Embedded {} outline entries and {} named destinations",
        outline_entries.len(),
        linked
    );

    let mut buffer = Vec::new();
    document.save_to(&mut buffer)?;
    Ok(buffer)
}

struct OutlineEntry {
    object_id: ObjectId,
    page_ref: ObjectId,
    title: String,
    anchor: AnchorName,
}

fn collect_outline_entries(
    document: &mut Document,
    headings: &[OutlineHeading],
    table: &PageTrackingTable,
    pages: &BTreeMap<u32, ObjectId>,
) -> Result<Vec<OutlineEntry>, BookmarkError> {
    let mut entries = Vec::new();

    for heading in headings {
        let Some(page_number) = table.physical_page(&heading.anchor) else {
            continue;
        };
        let page_ref = u32::try_from(page_number)
            .ok()
            .and_then(|number| pages.get(&number).copied())
            .ok_or_else(|| BookmarkError::MissingPage {
                anchor: heading.anchor.clone(),
                page_number,
            })?;

        entries.push(OutlineEntry {
            object_id: document.new_object_id(),
            page_ref,
            title: heading.title.clone(),
            anchor: heading.anchor.clone(),
        });
    }

    Ok(entries)
}

/// PDF text string: a literal for ASCII, UTF-16BE with byte order mark otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn page_destination(page_ref: ObjectId) -> Object {
    Object::Array(vec![Object::Reference(page_ref), Object::Name("Fit".into())])
}

/// `/Dests` name tree leaf; keys must be sorted, which the map guarantees.
fn destination_names(destinations: &BTreeMap<&AnchorName, ObjectId>) -> Dictionary {
    let names = destinations
        .iter()
        .flat_map(|(anchor, page_ref)| {
            [
                Object::string_literal(anchor.as_str()),
                page_destination(*page_ref),
            ]
        })
        .collect();
    let mut dests = Dictionary::new();
    dests.set("Names", Object::Array(names));
    dests
}

fn link_outline_entries(
    outlines_id: ObjectId,
    document: &mut Document,
    entries: &mut [OutlineEntry],
) {
    for index in 0..entries.len() {
        let mut dictionary = Dictionary::new();
        dictionary.set("Title", text_string(&entries[index].title));
        dictionary.set("Dest", page_destination(entries[index].page_ref));
        dictionary.set("Parent", Object::Reference(outlines_id));
        dictionary.set("NM", Object::string_literal(entries[index].anchor.as_str()));

        if index > 0 {
            dictionary.set("Prev", Object::Reference(entries[index - 1].object_id));
        }
        if index + 1 < entries.len() {
            dictionary.set("Next", Object::Reference(entries[index + 1].object_id));
        }

        document
            .objects
            .insert(entries[index].object_id, Object::Dictionary(dictionary));
    }
}

fn update_catalog(
    outlines_id: ObjectId,
    document: &mut Document,
    entries: &[OutlineEntry],
    dests: Dictionary,
) -> Result<(), BookmarkError> {
    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| BookmarkError::MissingCatalog)?;

    let mut outlines = Dictionary::new();
    outlines.set("Type", Object::Name("Outlines".into()));
    outlines.set("Count", Object::Integer(entries.len() as i64));
    if let Some(first) = entries.first() {
        outlines.set("First", Object::Reference(first.object_id));
    }
    if let Some(last) = entries.last() {
        outlines.set("Last", Object::Reference(last.object_id));
    }
    document
        .objects
        .insert(outlines_id, Object::Dictionary(outlines));

    let dests_id = document.add_object(Object::Dictionary(dests));
    let mut names = Dictionary::new();
    names.set("Dests", Object::Reference(dests_id));

    let catalog = document
        .objects
        .get_mut(&catalog_id)
        .ok_or(BookmarkError::MissingCatalog)?
        .as_dict_mut()
        .map_err(|_| BookmarkError::InvalidCatalog)?;
    catalog.set("Outlines", Object::Reference(outlines_id));
    catalog.set("Names", Object::Dictionary(names));
    catalog.set("PageMode", Object::Name("UseOutlines".into()));

    Ok(())
}
