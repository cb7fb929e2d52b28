//! Error types for the report assembly pipeline.
//!
//! Failures fall into four classes. Validation failures and render failures abort the build.
//! Unavailable resources (such as a logo) and tracking gaps are recovered where they occur and
//! only surface as log warnings.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[cfg(feature = "bookmarks")]
use crate::bookmarks::BookmarkError;

/// Front matter that cannot be turned into [`DocumentMetadata`](crate::metadata::DocumentMetadata).
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The document does not open with a `---` line.
    #[error("YAML front matter is required: the document must start with a '---' line")]
    MissingFrontMatter,

    /// The opening `---` line has no matching closing line.
    #[error("malformed YAML front matter: no closing '---' line")]
    UnterminatedFrontMatter,

    /// The front matter block holds no data.
    #[error("empty YAML front matter: student, document and university sections are required")]
    EmptyFrontMatter,

    /// The front matter is not valid YAML.
    #[error("error parsing YAML front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A required top-level section is absent.
    #[error("missing '{0}' section in YAML front matter")]
    MissingSection(&'static str),

    /// A top-level section is present but is not a mapping.
    #[error("section '{0}' must be a mapping of fields")]
    MalformedSection(&'static str),

    /// A required field is absent, null or blank.
    #[error("missing required field '{section}.{field}'")]
    MissingField {
        /// Section the field belongs to.
        section: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field holds a value that cannot be read as text.
    #[error("invalid value for '{section}.{field}': {reason}")]
    InvalidField {
        /// Section the field belongs to.
        section: &'static str,
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// Dotted `section.field` path for field-level errors.
    pub fn field_path(&self) -> Option<String> {
        match self {
            Self::MissingField { section, field } | Self::InvalidField { section, field, .. } => {
                Some(format!("{section}.{field}"))
            }
            _ => None,
        }
    }
}

/// An optional, decorative input that could not be used.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The resource could not be read or decoded.
    #[error("resource '{resource}' unavailable: {reason}")]
    Unavailable {
        /// Human-readable resource name, usually a path.
        resource: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Failures raised while laying out a pass.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The genpdf layout engine rejected the document.
    #[error("layout engine failed: {0}")]
    Layout(#[from] genpdf::error::Error),

    /// Writing the rendered bytes failed.
    #[error("failed to write rendered output: {0}")]
    Io(#[from] io::Error),

    /// A layout engine other than genpdf reported a failure.
    #[error("layout engine failed: {0}")]
    Engine(String),

    /// Navigation data could not be embedded into the final PDF.
    #[cfg(feature = "bookmarks")]
    #[error(transparent)]
    Bookmarks(#[from] BookmarkError),
}

/// Top-level failure of a build.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The front matter was rejected; nothing was rendered.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The markdown input does not exist.
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Reading the input or writing the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// One of the two render passes failed.
    #[error("render failure: {0}")]
    Render(#[from] RenderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_dotted_path() {
        let err = ValidationError::MissingField {
            section: "student",
            field: "supervisor",
        };
        assert_eq!(err.to_string(), "missing required field 'student.supervisor'");
        assert_eq!(err.field_path().as_deref(), Some("student.supervisor"));
    }

    #[test]
    fn section_errors_have_no_field_path() {
        let err = ValidationError::MissingSection("university");
        assert_eq!(
            err.to_string(),
            "missing 'university' section in YAML front matter"
        );
        assert!(err.field_path().is_none());
    }

    #[test]
    fn validation_error_converts_into_build_error() {
        let err: BuildError = ValidationError::EmptyFrontMatter.into();
        assert!(matches!(err, BuildError::Validation(_)));
    }
}
