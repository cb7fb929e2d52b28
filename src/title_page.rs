//! Title page content.
//!
//! [`TitlePage::compose`] gathers everything page 1 shows from validated metadata. It is pure so
//! both passes draw the same page and tests can check it without a renderer.

use crate::metadata::DocumentMetadata;

/// Content of the title page in top-to-bottom order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TitlePage {
    /// Research lab name; printed in place of the logo when none can be shown.
    pub lab: String,
    pub university: String,
    pub university_subtitle: String,
    pub document_type: String,
    /// Declared title. This is the only place the title heading is rendered.
    pub title: Option<String>,
    pub subtitle: Option<String>,
    /// `by <name>` line.
    pub author_line: String,
    /// Information table as `(label, value)` rows.
    pub rows: Vec<(String, String)>,
}

impl TitlePage {
    /// Composes the title page from `metadata`.
    pub fn compose(metadata: &DocumentMetadata) -> Self {
        let student = &metadata.student;
        let document = &metadata.document;
        let labels = &metadata.table_labels;

        let rows = [
            (&labels.author, &student.name),
            (&labels.student_id, &student.student_id),
            (&labels.program, &student.program),
            (&labels.faculty, &metadata.university.faculty),
            (&labels.specialization, &student.specialization),
            (&labels.research_lab, &student.research_lab),
            (&labels.supervisor, &student.supervisor),
            (&labels.co_supervisor, &student.co_supervisor),
            (&labels.academic_year, &student.academic_year),
            (&labels.submission_date, &document.submission_date),
        ]
        .into_iter()
        .map(|(label, value)| (label.clone(), value.clone()))
        .collect();

        Self {
            lab: student.research_lab.clone(),
            university: metadata.university.name.clone(),
            university_subtitle: metadata.university.subtitle.clone(),
            document_type: document.doc_type.clone(),
            title: document.title.clone(),
            subtitle: document.subtitle.clone(),
            author_line: format!("by {}", student.name),
            rows,
        }
    }

    /// Running header text for pages after the first.
    pub fn running_header(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.document_type)
    }

    /// Footer text naming the university.
    pub fn footer_text(&self) -> String {
        format!("{} {}", self.university, self.university_subtitle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata;

    const SOURCE: &str = "---
student:
  name: Jane Doe
  student_id: 42
  program: SE
  specialization: Systems
  supervisor: Smith
  co_supervisor: Miller
  academic_year: 2025
document:
  type: Research Proposal
  submission_date: March 2025
  title: Fast Things
university:
  name: Heilbronn University
  subtitle: of Applied Sciences
  faculty: Computer Science
table_labels:
  author: \"Verfasser:\"
---
";

    #[test]
    fn composes_rows_in_order_with_labels() {
        let (metadata, _) = metadata::from_source(SOURCE).expect("valid front matter");
        let page = TitlePage::compose(&metadata);
        assert_eq!(page.rows.len(), 10);
        assert_eq!(page.rows[0], ("Verfasser:".to_owned(), "Jane Doe".to_owned()));
        assert_eq!(page.rows[1].1, "42");
        assert_eq!(page.rows[3], ("Faculty:".to_owned(), "Computer Science".to_owned()));
        assert_eq!(page.rows[9].1, "March 2025");
        assert_eq!(page.author_line, "by Jane Doe");
        assert_eq!(page.title.as_deref(), Some("Fast Things"));
    }

    #[test]
    fn header_falls_back_to_document_type() {
        let source = SOURCE.replace("  title: Fast Things\n", "");
        let (metadata, _) = metadata::from_source(&source).expect("valid front matter");
        let page = TitlePage::compose(&metadata);
        assert_eq!(page.running_header(), "Research Proposal");
        assert_eq!(page.footer_text(), "Heilbronn University of Applied Sciences");
    }
}
