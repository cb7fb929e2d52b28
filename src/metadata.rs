//! Front matter splitting and validation.
//!
//! A report opens with a YAML block between two `---` lines. [`split_front_matter`] separates it
//! from the markdown body and [`validate`] turns it into a [`DocumentMetadata`]. Validation is
//! fail-fast: sections are checked in the order `student`, `document`, `university`, and within a
//! section the first missing required field is reported. Optional fields always end up with a
//! deterministic default so later stages never special-case "missing".

use std::collections::BTreeMap;

use log::{debug, info};
use serde_yaml::Value;

use crate::error::ValidationError;

/// Research lab shown when the front matter does not name one.
pub const DEFAULT_RESEARCH_LAB: &str = "UniTyLab (University Technology Lab)";

const STUDENT: &str = "student";
const DOCUMENT: &str = "document";
const UNIVERSITY: &str = "university";
const TABLE_LABELS: &str = "table_labels";
const FLAGS: &str = "flags";

/// Validated front matter of a report. Constructed once per build and never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Author and supervision details.
    pub student: StudentInfo,
    /// Document type, title and layout flags.
    pub document: DocumentInfo,
    /// Issuing university.
    pub university: UniversityInfo,
    /// Labels of the title-page information table.
    pub table_labels: TableLabels,
}

impl DocumentMetadata {
    /// Declared document title, if any.
    pub fn title(&self) -> Option<&str> {
        self.document.title.as_deref()
    }
}

/// The `student` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudentInfo {
    pub name: String,
    pub student_id: String,
    pub program: String,
    pub specialization: String,
    pub supervisor: String,
    pub co_supervisor: String,
    pub academic_year: String,
    /// Defaults to [`DEFAULT_RESEARCH_LAB`].
    pub research_lab: String,
}

/// The `document` section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Document type, e.g. "Research Proposal" (`type` in YAML).
    pub doc_type: String,
    pub submission_date: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    /// Place the table of contents on the title page instead of its own page.
    pub toc_on_title_page: bool,
    /// Emit the author's signature line.
    pub signature_line: bool,
    /// Emit the supervisor's signature line.
    pub supervisor_signature: bool,
    /// Emit the co-supervisor's signature line.
    pub co_supervisor_signature: bool,
    /// Flags from the `flags` section that the generator does not interpret itself.
    pub extension_flags: BTreeMap<String, bool>,
}

impl DocumentInfo {
    /// Returns whether any signature block is requested.
    pub fn wants_signatures(&self) -> bool {
        self.signature_line || self.supervisor_signature || self.co_supervisor_signature
    }

    fn flag_mut(&mut self, name: &str) -> Option<&mut bool> {
        match name {
            "toc_on_title_page" => Some(&mut self.toc_on_title_page),
            "signature_line" => Some(&mut self.signature_line),
            "supervisor_signature" => Some(&mut self.supervisor_signature),
            "co_supervisor_signature" => Some(&mut self.co_supervisor_signature),
            _ => None,
        }
    }
}

/// The `university` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniversityInfo {
    pub name: String,
    pub subtitle: String,
    pub faculty: String,
    pub department: Option<String>,
}

/// Labels of the title-page information table; every field has a compiled-in default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableLabels {
    pub author: String,
    pub student_id: String,
    pub program: String,
    pub faculty: String,
    pub specialization: String,
    pub research_lab: String,
    pub supervisor: String,
    pub co_supervisor: String,
    pub academic_year: String,
    pub submission_date: String,
    /// Title of the table of contents.
    pub table_of_contents: String,
}

impl Default for TableLabels {
    fn default() -> Self {
        Self {
            author: "Author:".into(),
            student_id: "Student ID:".into(),
            program: "Program:".into(),
            faculty: "Faculty:".into(),
            specialization: "Studiengang:".into(),
            research_lab: "Research Lab:".into(),
            supervisor: "Supervisor:".into(),
            co_supervisor: "Co-Supervisor:".into(),
            academic_year: "Academic Year:".into(),
            submission_date: "Submission Date:".into(),
            table_of_contents: "Table of Contents".into(),
        }
    }
}

impl TableLabels {
    fn label_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "author" => Some(&mut self.author),
            "student_id" => Some(&mut self.student_id),
            "program" => Some(&mut self.program),
            "faculty" => Some(&mut self.faculty),
            "specialization" => Some(&mut self.specialization),
            "research_lab" => Some(&mut self.research_lab),
            "supervisor" => Some(&mut self.supervisor),
            "co_supervisor" => Some(&mut self.co_supervisor),
            "academic_year" => Some(&mut self.academic_year),
            "submission_date" => Some(&mut self.submission_date),
            "table_of_contents" => Some(&mut self.table_of_contents),
            _ => None,
        }
    }
}

/// Splits `source` into the raw front matter and the markdown body.
///
/// The first line (ignoring a byte order mark) must be `---`; the next line that trims to `---`
/// closes the block. The body is everything after the closing line.
pub fn split_front_matter(source: &str) -> Result<(Value, String), ValidationError> {
    let mut lines = source.lines();
    let first = lines
        .next()
        .map(|line| line.trim_start_matches('\u{feff}').trim())
        .ok_or(ValidationError::MissingFrontMatter)?;
    if first != "---" {
        return Err(ValidationError::MissingFrontMatter);
    }

    let mut yaml_lines = Vec::new();
    let mut closed = false;
    for line in lines.by_ref() {
        if line.trim() == "---" {
            closed = true;
            break;
        }
        yaml_lines.push(line);
    }
    if !closed {
        return Err(ValidationError::UnterminatedFrontMatter);
    }

    let raw: Value = serde_yaml::from_str(&yaml_lines.join("\n"))?;
    if raw.is_null() {
        return Err(ValidationError::EmptyFrontMatter);
    }
    let body = lines.collect::<Vec<_>>().join("\n");
    Ok((raw, body))
}

/// Splits and validates in one step.
pub fn from_source(source: &str) -> Result<(DocumentMetadata, String), ValidationError> {
    let (raw, body) = split_front_matter(source)?;
    let metadata = validate(&raw)?;
    Ok((metadata, body))
}

/// Validates raw front matter into typed metadata.
pub fn validate(raw: &Value) -> Result<DocumentMetadata, ValidationError> {
    if !raw.is_mapping() {
        return Err(ValidationError::EmptyFrontMatter);
    }

    let student = parse_student(&Section::find(raw, STUDENT)?)?;
    info!("Loaded student info: {}", student.name);

    let mut document = parse_document(&Section::find(raw, DOCUMENT)?)?;
    let university = parse_university(&Section::find(raw, UNIVERSITY)?)?;
    info!("Loaded university info: {}", university.name);

    let table_labels = match Section::find_optional(raw, TABLE_LABELS)? {
        Some(section) => parse_table_labels(&section)?,
        None => TableLabels::default(),
    };

    if let Some(flags) = Section::find_optional(raw, FLAGS)? {
        apply_flags(&flags, &mut document);
    }
    debug!(
        "Document '{}' (toc on title page: {}, signatures: {})",
        document.title.as_deref().unwrap_or(&document.doc_type),
        document.toc_on_title_page,
        document.wants_signatures()
    );

    Ok(DocumentMetadata {
        student,
        document,
        university,
        table_labels,
    })
}

fn parse_student(section: &Section<'_>) -> Result<StudentInfo, ValidationError> {
    Ok(StudentInfo {
        name: section.required("name")?,
        student_id: section.required("student_id")?,
        program: section.required("program")?,
        specialization: section.required("specialization")?,
        supervisor: section.required("supervisor")?,
        co_supervisor: section.required("co_supervisor")?,
        academic_year: section.required("academic_year")?,
        research_lab: section
            .optional("research_lab")?
            .unwrap_or_else(|| DEFAULT_RESEARCH_LAB.to_owned()),
    })
}

fn parse_document(section: &Section<'_>) -> Result<DocumentInfo, ValidationError> {
    Ok(DocumentInfo {
        doc_type: section.required("type")?,
        submission_date: section.required("submission_date")?,
        title: section.optional("title")?,
        subtitle: section.optional("subtitle")?,
        toc_on_title_page: section.flag("toc_on_title_page"),
        signature_line: section.flag("signature_line"),
        supervisor_signature: section.flag("supervisor_signature"),
        co_supervisor_signature: section.flag("co_supervisor_signature"),
        extension_flags: BTreeMap::new(),
    })
}

fn parse_university(section: &Section<'_>) -> Result<UniversityInfo, ValidationError> {
    Ok(UniversityInfo {
        name: section.required("name")?,
        subtitle: section.required("subtitle")?,
        faculty: section.required("faculty")?,
        department: section.optional("department")?,
    })
}

fn parse_table_labels(section: &Section<'_>) -> Result<TableLabels, ValidationError> {
    let mut labels = TableLabels::default();
    for (key, value) in section.entries() {
        let Some(slot) = labels.label_mut(key) else {
            debug!("Ignoring unknown table label '{key}'");
            continue;
        };
        if let Some(text) = scalar_text(TABLE_LABELS, "label", value)? {
            *slot = text;
        }
    }
    Ok(labels)
}

fn apply_flags(section: &Section<'_>, document: &mut DocumentInfo) {
    for (key, value) in section.entries() {
        let enabled = is_truthy(value);
        match document.flag_mut(key) {
            Some(slot) => *slot = enabled,
            None => {
                document.extension_flags.insert(key.to_owned(), enabled);
            }
        }
    }
    info!(
        "Loaded flags: {} enabled",
        section.entries().filter(|(_, value)| is_truthy(value)).count()
    );
}

/// A top-level front matter section known to be a mapping.
struct Section<'a> {
    name: &'static str,
    value: &'a Value,
}

impl<'a> Section<'a> {
    fn find(raw: &'a Value, name: &'static str) -> Result<Self, ValidationError> {
        Self::find_optional(raw, name)?.ok_or(ValidationError::MissingSection(name))
    }

    fn find_optional(raw: &'a Value, name: &'static str) -> Result<Option<Self>, ValidationError> {
        match raw.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) if value.is_mapping() => Ok(Some(Self { name, value })),
            Some(_) => Err(ValidationError::MalformedSection(name)),
        }
    }

    fn required(&self, field: &'static str) -> Result<String, ValidationError> {
        self.optional(field)?
            .filter(|text| !text.trim().is_empty())
            .ok_or(ValidationError::MissingField {
                section: self.name,
                field,
            })
    }

    fn optional(&self, field: &'static str) -> Result<Option<String>, ValidationError> {
        match self.value.get(field) {
            Some(value) => scalar_text(self.name, field, value),
            None => Ok(None),
        }
    }

    fn flag(&self, field: &str) -> bool {
        self.value.get(field).is_some_and(is_truthy)
    }

    fn entries(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.value
            .as_mapping()
            .into_iter()
            .flat_map(|mapping| mapping.iter())
            .filter_map(|(key, value)| key.as_str().map(|key| (key, value)))
    }
}

/// Reads a scalar as text. Numbers and booleans stringify losslessly; null is absent.
fn scalar_text(
    section: &'static str,
    field: &'static str,
    value: &Value,
) -> Result<Option<String>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        Value::Tagged(tagged) => scalar_text(section, field, &tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => Err(ValidationError::InvalidField {
            section,
            field,
            reason: "expected a scalar value".into(),
        }),
    }
}

/// Truthiness of a raw flag value: null, false, zero and empty values are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Sequence(items) => !items.is_empty(),
        Value::Mapping(entries) => !entries.is_empty(),
        Value::Tagged(tagged) => is_truthy(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRONT_MATTER: &str = "---
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
  title: My Title
university:
  name: Heilbronn University
  subtitle: of Applied Sciences
  faculty: Computer Science
---
# My Title

Body text.";

    fn replace(source: &str, from: &str, to: &str) -> String {
        source.replacen(from, to, 1)
    }

    #[test]
    fn splits_front_matter_from_body() {
        let (raw, body) = split_front_matter(FRONT_MATTER).expect("split succeeds");
        assert!(raw.get("student").is_some());
        assert_eq!(body, "# My Title\n\nBody text.");
    }

    #[test]
    fn validates_required_and_defaults_optional_fields() {
        let (metadata, _) = from_source(FRONT_MATTER).expect("valid front matter");
        assert_eq!(metadata.student.name, "Jane Doe");
        assert_eq!(metadata.student.student_id, "204711");
        assert_eq!(metadata.student.research_lab, DEFAULT_RESEARCH_LAB);
        assert_eq!(metadata.title(), Some("My Title"));
        assert_eq!(metadata.document.subtitle, None);
        assert_eq!(metadata.university.department, None);
        assert!(!metadata.document.toc_on_title_page);
        assert!(!metadata.document.wants_signatures());
        assert_eq!(metadata.table_labels, TableLabels::default());
    }

    #[test]
    fn missing_front_matter_is_rejected() {
        let err = from_source("# Just markdown").unwrap_err();
        assert!(matches!(err, ValidationError::MissingFrontMatter));
    }

    #[test]
    fn unterminated_front_matter_is_rejected() {
        let err = from_source("---\nstudent:\n  name: x\n").unwrap_err();
        assert!(matches!(err, ValidationError::UnterminatedFrontMatter));
    }

    #[test]
    fn empty_front_matter_is_rejected() {
        let err = from_source("---\n---\nbody").unwrap_err();
        assert!(matches!(err, ValidationError::EmptyFrontMatter));
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let err = from_source("---\nstudent: [unclosed\n---\n").unwrap_err();
        assert!(matches!(err, ValidationError::Yaml(_)));
    }

    #[test]
    fn missing_section_is_reported() {
        let source = FRONT_MATTER.replace("university:", "college:");
        let err = from_source(&source).unwrap_err();
        assert!(matches!(err, ValidationError::MissingSection("university")));
    }

    #[test]
    fn missing_supervisor_names_the_field() {
        let source = replace(FRONT_MATTER, "  supervisor: Prof. Dr. Smith\n", "");
        let err = from_source(&source).unwrap_err();
        assert_eq!(err.field_path().as_deref(), Some("student.supervisor"));
    }

    #[test]
    fn blank_required_field_counts_as_missing() {
        let source = replace(FRONT_MATTER, "type: Research Proposal", "type: \"  \"");
        let err = from_source(&source).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingField {
                section: "document",
                field: "type"
            }
        ));
    }

    #[test]
    fn first_failing_section_wins() {
        let source = replace(FRONT_MATTER, "  name: Jane Doe\n", "");
        let source = source.replace("document:", "doc:");
        let err = from_source(&source).unwrap_err();
        assert_eq!(err.field_path().as_deref(), Some("student.name"));
    }

    #[test]
    fn sequence_in_string_field_is_invalid() {
        let source = replace(FRONT_MATTER, "program: Software Engineering", "program: [a, b]");
        let err = from_source(&source).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "program", .. }));
    }

    #[test]
    fn flags_use_truthiness() {
        let source = replace(
            FRONT_MATTER,
            "  title: My Title\n",
            "  title: My Title\n  toc_on_title_page: 1\n  signature_line: \"yes\"\n  supervisor_signature: 0\n",
        );
        let (metadata, _) = from_source(&source).expect("valid front matter");
        assert!(metadata.document.toc_on_title_page);
        assert!(metadata.document.signature_line);
        assert!(!metadata.document.supervisor_signature);
    }

    #[test]
    fn flags_section_overrides_and_collects_extensions() {
        let source = replace(
            FRONT_MATTER,
            "university:",
            "flags:\n  co_supervisor_signature: true\n  draft_watermark: true\nuniversity:",
        );
        let (metadata, _) = from_source(&source).expect("valid front matter");
        assert!(metadata.document.co_supervisor_signature);
        assert_eq!(
            metadata.document.extension_flags.get("draft_watermark"),
            Some(&true)
        );
    }

    #[test]
    fn table_labels_fall_back_per_field() {
        let source = replace(
            FRONT_MATTER,
            "university:",
            "table_labels:\n  author: \"Verfasser:\"\n  program: null\nuniversity:",
        );
        let (metadata, _) = from_source(&source).expect("valid front matter");
        assert_eq!(metadata.table_labels.author, "Verfasser:");
        assert_eq!(metadata.table_labels.program, "Program:");
        assert_eq!(metadata.table_labels.supervisor, "Supervisor:");
    }

    #[test]
    fn null_optional_field_uses_default() {
        let source = replace(
            FRONT_MATTER,
            "  academic_year: 2024/25\n",
            "  academic_year: 2024/25\n  research_lab: null\n",
        );
        let (metadata, _) = from_source(&source).expect("valid front matter");
        assert_eq!(metadata.student.research_lab, DEFAULT_RESEARCH_LAB);
    }
}
