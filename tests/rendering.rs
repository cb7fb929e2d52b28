use proposal_pdf::layout::{LayoutEngine, RenderFrame, RenderPass};
use proposal_pdf::title_page::TitlePage;
use proposal_pdf::toc::{self, TocMode};
use proposal_pdf::tracking::{FrontMatterLayout, PageTracker, PageTrackingTable};
use proposal_pdf::{fonts, metadata, parser, AnchorName, Assembler, BuildOptions, GenpdfEngine};
use sha2::{Digest, Sha256};

const SOURCE: &str = "---
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
  title: Sample Proposal
  signature_line: true
  supervisor_signature: true
university:
  name: Heilbronn University
  subtitle: of Applied Sciences
  faculty: Computer Science
---
# Sample Proposal

# Intro

Hello **world** with `code`.

## Background

- first
- second

1. one
2. two

> A quote.

```
fn main() {
    println!(\"hi\");
}
```
";

const SKIP_MESSAGE: &str =
    "bundled fonts missing. Set PROPOSAL_PDF_FONTS_DIR or copy assets/fonts next to the binary.";

/// Renders one measurement pass directly through the engine, without bookmarks.
fn render_measure_pass() -> Option<Vec<u8>> {
    if !fonts::default_fonts_available() {
        return None;
    }

    let (metadata, body) = metadata::from_source(SOURCE).expect("valid front matter");
    let parsed = parser::parse(&body, &metadata);
    let layout = FrontMatterLayout::plan(false, parsed.outline.is_empty());
    let title_page = TitlePage::compose(&metadata);
    let toc = toc::resolve(
        &parsed.outline,
        &PageTrackingTable::new(layout),
        &metadata,
        TocMode::Unnumbered,
    );
    let frame = RenderFrame {
        pass: RenderPass::Measure,
        layout,
        title_page: &title_page,
        toc: &toc,
        body: &parsed.blocks,
        signatures: None,
    };

    let mut bytes = Vec::new();
    GenpdfEngine::new()
        .render(&frame, &PageTracker::new(layout), &mut bytes)
        .expect("render sample pdf");
    Some(bytes)
}

fn build_sample() -> Option<proposal_pdf::BuildOutput> {
    if !fonts::default_fonts_available() {
        return None;
    }
    let options = BuildOptions::new().with_signature_date("01.03.2025");
    let output = Assembler::with_options(GenpdfEngine::new(), options)
        .build(SOURCE)
        .expect("build sample pdf");
    Some(output)
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() {
                    let byte = data[cursor];
                    if byte == terminator {
                        break;
                    }
                    if terminator == b')' {
                        data[cursor] = b'0';
                    } else if !matches!(byte, b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t') {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while offset + start.len() < data.len() {
            if let Some(start_pos) = data[offset..]
                .windows(start.len())
                .position(|window| window == start)
            {
                let start_index = offset + start_pos + start.len();
                if let Some(end_pos) = data[start_index..]
                    .windows(end.len())
                    .position(|window| window == end)
                {
                    for byte in &mut data[start_index..start_index + end_pos] {
                        if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                            *byte = b'0';
                        }
                    }
                    offset = start_index + end_pos + end.len();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    scrub_segment(&mut normalized, b"/Producer(", b')');
    scrub_xml(&mut normalized, b"<xmp:CreateDate>", b"</xmp:CreateDate>");
    scrub_xml(&mut normalized, b"<xmp:ModifyDate>", b"</xmp:ModifyDate>");
    scrub_xml(
        &mut normalized,
        b"<xmp:MetadataDate>",
        b"</xmp:MetadataDate>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:DocumentID>",
        b"</xmpMM:DocumentID>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:InstanceID>",
        b"</xmpMM:InstanceID>",
    );
    scrub_xml(&mut normalized, b"<xmpMM:VersionID>", b"</xmpMM:VersionID>");
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    let normalized = scrub_pdf(bytes);
    let digest = Sha256::digest(&normalized);
    digest.into()
}

#[test]
fn renders_non_empty_output() {
    let Some(bytes) = render_measure_pass() else {
        eprintln!("Skipping renders_non_empty_output: {SKIP_MESSAGE}");
        return;
    };
    assert!(bytes.starts_with(b"%PDF"), "rendered bytes should be a PDF");
}

#[test]
fn rendering_is_deterministic() {
    let (Some(bytes_a), Some(bytes_b)) = (render_measure_pass(), render_measure_pass()) else {
        eprintln!("Skipping rendering_is_deterministic: {SKIP_MESSAGE}");
        return;
    };

    assert_eq!(bytes_a.len(), bytes_b.len(), "PDF sizes should match");

    let hash_a = normalized_hash(&bytes_a);
    let hash_b = normalized_hash(&bytes_b);

    assert_eq!(
        hash_a, hash_b,
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn headings_are_tracked_after_the_front_pages() {
    let Some(output) = build_sample() else {
        eprintln!("Skipping headings_are_tracked_after_the_front_pages: {SKIP_MESSAGE}");
        return;
    };

    assert_eq!(output.layout, FrontMatterLayout::SeparateToc);
    assert!(output.tracking_gaps.is_empty());
    assert_eq!(output.measured.body_start(), Some(3));
    let intro = AnchorName::from_heading("Intro");
    assert_eq!(output.measured.physical_page(&intro), Some(3));
    assert_eq!(output.measured.content_page(&intro), Some(1));
    assert!(output.measured.drift(&output.rendered).is_empty());
}

#[cfg(feature = "bookmarks")]
#[test]
fn final_pdf_carries_named_destinations() {
    let Some(output) = build_sample() else {
        eprintln!("Skipping final_pdf_carries_named_destinations: {SKIP_MESSAGE}");
        return;
    };

    let document = lopdf::Document::load_mem(&output.bytes).expect("final pdf parses");
    assert!(document.get_pages().len() >= 3);
    let catalog = document.catalog().expect("catalog");
    assert!(catalog.get(b"Names").is_ok());

    let outlines_id = catalog
        .get(b"Outlines")
        .and_then(lopdf::Object::as_reference)
        .expect("outlines reference");
    let outlines = document
        .get_dictionary(outlines_id)
        .expect("outlines dictionary");
    // The title heading is not part of the body, so only Intro and Background remain.
    assert_eq!(
        outlines.get(b"Count").and_then(lopdf::Object::as_i64).ok(),
        Some(2)
    );
    let first_id = outlines
        .get(b"First")
        .and_then(lopdf::Object::as_reference)
        .expect("first entry");
    let first = document.get_dictionary(first_id).expect("first entry dictionary");
    assert_eq!(
        first.get(b"Title").and_then(lopdf::Object::as_str).ok(),
        Some(&b"Intro"[..])
    );
}
