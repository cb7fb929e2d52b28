//! Signature blocks placed after the body.

use chrono::Local;

use crate::metadata::DocumentMetadata;

/// Date format printed under the author's signature.
pub const SIGNATURE_DATE_FORMAT: &str = "%d.%m.%Y";

/// Today's date in [`SIGNATURE_DATE_FORMAT`].
pub fn today() -> String {
    Local::now().format(SIGNATURE_DATE_FORMAT).to_string()
}

/// Author signature with its date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorSignature {
    pub name: String,
    pub date: String,
}

/// Which signature lines to draw. Names are upper-cased.
///
/// The author and supervisor share the first row (left and right column); the co-supervisor gets
/// a right-aligned row below.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignaturePlan {
    pub author: Option<AuthorSignature>,
    pub supervisor: Option<String>,
    pub co_supervisor: Option<String>,
}

impl SignaturePlan {
    /// Builds the plan from the document flags, or `None` when no signature is requested.
    pub fn from_metadata(metadata: &DocumentMetadata, date: &str) -> Option<Self> {
        let document = &metadata.document;
        if !document.wants_signatures() {
            return None;
        }
        let student = &metadata.student;
        Some(Self {
            author: document.signature_line.then(|| AuthorSignature {
                name: student.name.to_uppercase(),
                date: date.to_owned(),
            }),
            supervisor: document
                .supervisor_signature
                .then(|| student.supervisor.to_uppercase()),
            co_supervisor: document
                .co_supervisor_signature
                .then(|| student.co_supervisor.to_uppercase()),
        })
    }

    /// Returns whether the first row (author and supervisor) is drawn.
    pub fn has_first_row(&self) -> bool {
        self.author.is_some() || self.supervisor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata;

    fn metadata(flags: &str) -> DocumentMetadata {
        let source = format!(
            "---
student: {{name: Jane Doe, student_id: '1', program: P, specialization: S, supervisor: Prof. Smith, co_supervisor: Dr. Müller, academic_year: '2025'}}
document: {{type: Proposal, submission_date: now}}
university: {{name: U, subtitle: S, faculty: F}}
flags: {{{flags}}}
---
"
        );
        metadata::from_source(&source).expect("valid front matter").0
    }

    #[test]
    fn no_flags_means_no_plan() {
        assert!(SignaturePlan::from_metadata(&metadata(""), "01.01.2025").is_none());
    }

    #[test]
    fn names_are_upper_cased() {
        let plan = SignaturePlan::from_metadata(
            &metadata("signature_line: true, co_supervisor_signature: true"),
            "01.01.2025",
        )
        .expect("signatures requested");
        let author = plan.author.as_ref().expect("author line");
        assert_eq!(author.name, "JANE DOE");
        assert_eq!(author.date, "01.01.2025");
        assert!(plan.supervisor.is_none());
        assert_eq!(plan.co_supervisor.as_deref(), Some("DR. MÜLLER"));
        assert!(plan.has_first_row());
    }

    #[test]
    fn supervisor_only_plan() {
        let plan = SignaturePlan::from_metadata(&metadata("supervisor_signature: yes"), "d")
            .expect("signatures requested");
        assert_eq!(plan.supervisor.as_deref(), Some("PROF. SMITH"));
        assert!(plan.author.is_none());
    }

    #[test]
    fn today_uses_day_month_year() {
        let date = today();
        assert_eq!(date.len(), 10);
        assert_eq!(date.matches('.').count(), 2);
    }
}
