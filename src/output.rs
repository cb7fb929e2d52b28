//! Output location and the final write.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

/// Directory, next to the input, that receives generated documents.
pub const OUTPUT_DIR: &str = "Output";
/// File name prefix of generated documents.
pub const DEFAULT_PREFIX: &str = "HHN_";

/// Decides where the document built from `input` is written.
///
/// Without an explicit path the result is `<input dir>/Output/<prefix><stem>.pdf`. An explicit
/// bare file name is placed in that same `Output` directory; an explicit path containing a
/// directory is used as given.
pub fn resolve_output_path(input: &Path, explicit: Option<&Path>, prefix: &str) -> PathBuf {
    let output_dir = input
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(OUTPUT_DIR);

    match explicit {
        Some(path) if has_directory(path) => path.to_path_buf(),
        Some(name) => output_dir.join(name),
        None => {
            let stem = input
                .file_stem()
                .map(|stem| stem.to_string_lossy())
                .unwrap_or_else(|| "document".into());
            output_dir.join(format!("{prefix}{stem}.pdf"))
        }
    }
}

fn has_directory(path: &Path) -> bool {
    path.parent()
        .is_some_and(|parent| !parent.as_os_str().is_empty())
}

/// Writes `bytes` to `path` through a temporary file in the same directory.
///
/// The target appears only once everything has been written; on failure no file is left behind.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_uses_prefix_and_output_dir() {
        let path = resolve_output_path(Path::new("docs/proposal.md"), None, DEFAULT_PREFIX);
        assert_eq!(path, Path::new("docs/Output/HHN_proposal.pdf"));
    }

    #[test]
    fn bare_name_goes_to_output_dir() {
        let path = resolve_output_path(
            Path::new("report.md"),
            Some(Path::new("custom.pdf")),
            DEFAULT_PREFIX,
        );
        assert_eq!(path, Path::new("Output/custom.pdf"));
    }

    #[test]
    fn explicit_directory_is_kept() {
        let path = resolve_output_path(
            Path::new("report.md"),
            Some(Path::new("/full/path/thesis.pdf")),
            DEFAULT_PREFIX,
        );
        assert_eq!(path, Path::new("/full/path/thesis.pdf"));
    }

    #[test]
    fn atomic_write_creates_parent_and_replaces() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("Output").join("doc.pdf");
        write_atomically(&target, b"first").expect("first write");
        write_atomically(&target, b"second").expect("second write");
        assert_eq!(fs::read(&target).expect("read back"), b"second");
        let entries = fs::read_dir(dir.path().join("Output"))
            .expect("list output")
            .count();
        assert_eq!(entries, 1);
    }
}
