//! Font discovery for the genpdf renderer.
//!
//! genpdf embeds TrueType fonts, so a family with regular, bold, italic and bold-italic faces must
//! be found on disk. Sources are tried in order:
//!
//! 1. Roboto in `PROPOSAL_PDF_FONTS_DIR`, next to the executable, or in the crate's `assets/fonts`;
//! 2. Liberation Sans in the usual Linux system font directories;
//! 3. Arial from `PROPOSAL_PDF_WINDOWS_FONTS_DIR` or the Windows font directory.
//!
//! Code is set in a monospace family searched the same way (Roboto Mono, Liberation Mono, Courier
//! New). Without one, code falls back to the body family.

use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{FontData, FontFamily};
use log::{debug, warn};

/// Environment variable naming a directory with the Roboto font files.
pub const FONTS_DIR_ENV: &str = "PROPOSAL_PDF_FONTS_DIR";
/// Environment variable naming a directory with the Windows Arial font files.
pub const WINDOWS_FONTS_DIR_ENV: &str = "PROPOSAL_PDF_WINDOWS_FONTS_DIR";

/// Name of the preferred font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

const SYSTEM_FAMILY_NAME: &str = "LiberationSans";
const SYSTEM_FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/liberation2",
    "/usr/share/fonts/liberation",
    "/usr/share/fonts/liberation-sans",
    "/usr/share/fonts/liberation-mono",
];

/// Face file names of a family, in regular/bold/italic/bold-italic order.
#[derive(Clone, Copy, Debug)]
struct FaceFiles {
    family: &'static str,
    files: [&'static str; 4],
}

const ROBOTO: FaceFiles = FaceFiles {
    family: DEFAULT_FONT_FAMILY_NAME,
    files: [
        "Roboto-Regular.ttf",
        "Roboto-Bold.ttf",
        "Roboto-Italic.ttf",
        "Roboto-BoldItalic.ttf",
    ],
};

const LIBERATION_SANS: FaceFiles = FaceFiles {
    family: SYSTEM_FAMILY_NAME,
    files: [
        "LiberationSans-Regular.ttf",
        "LiberationSans-Bold.ttf",
        "LiberationSans-Italic.ttf",
        "LiberationSans-BoldItalic.ttf",
    ],
};

const ARIAL: FaceFiles = FaceFiles {
    family: "Arial",
    files: ["arial.ttf", "arialbd.ttf", "ariali.ttf", "arialbi.ttf"],
};

const ROBOTO_MONO: FaceFiles = FaceFiles {
    family: "RobotoMono",
    files: [
        "RobotoMono-Regular.ttf",
        "RobotoMono-Bold.ttf",
        "RobotoMono-Italic.ttf",
        "RobotoMono-BoldItalic.ttf",
    ],
};

const LIBERATION_MONO: FaceFiles = FaceFiles {
    family: "LiberationMono",
    files: [
        "LiberationMono-Regular.ttf",
        "LiberationMono-Bold.ttf",
        "LiberationMono-Italic.ttf",
        "LiberationMono-BoldItalic.ttf",
    ],
};

const COURIER_NEW: FaceFiles = FaceFiles {
    family: "CourierNew",
    files: ["cour.ttf", "courbd.ttf", "couri.ttf", "courbi.ttf"],
};

/// One directory that was searched and why it was rejected.
#[derive(Debug)]
struct Attempt {
    directory: PathBuf,
    missing: Vec<&'static str>,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.missing.is_empty() {
            write!(f, "{} (directory missing)", self.directory.display())
        } else {
            write!(
                f,
                "{} (missing files [{}])",
                self.directory.display(),
                self.missing.join(", ")
            )
        }
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
}

fn push_unique(candidates: &mut Vec<PathBuf>, candidate: PathBuf) {
    if !candidates.contains(&candidate) {
        candidates.push(candidate);
    }
}

fn bundled_directories() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = env_path(FONTS_DIR_ENV) {
        candidates.push(path);
    }
    if let Some(bin_dir) = env::current_exe().ok().as_deref().and_then(Path::parent) {
        push_unique(&mut candidates, bin_dir.join("assets/fonts"));
    }
    push_unique(
        &mut candidates,
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"),
    );
    candidates
}

fn windows_directories() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = env_path(WINDOWS_FONTS_DIR_ENV).into_iter().collect();
    if cfg!(windows) {
        for var in ["WINDIR", "SystemRoot"] {
            if let Some(root) = env_path(var) {
                push_unique(&mut candidates, root.join("Fonts"));
            }
        }
    }
    candidates
}

/// All `(directory, faces)` pairs in search order.
fn plan_for(
    bundled_faces: FaceFiles,
    system_faces: FaceFiles,
    windows_faces: FaceFiles,
) -> Vec<(PathBuf, FaceFiles)> {
    let bundled = bundled_directories()
        .into_iter()
        .map(|dir| (dir, bundled_faces));
    let system = SYSTEM_FONT_DIRS
        .iter()
        .map(|dir| (PathBuf::from(dir), system_faces));
    let windows = windows_directories()
        .into_iter()
        .map(|dir| (dir, windows_faces));
    bundled.chain(system).chain(windows).collect()
}

fn search_plan() -> Vec<(PathBuf, FaceFiles)> {
    plan_for(ROBOTO, LIBERATION_SANS, ARIAL)
}

fn monospace_plan() -> Vec<(PathBuf, FaceFiles)> {
    plan_for(ROBOTO_MONO, LIBERATION_MONO, COURIER_NEW)
}

fn check(directory: &Path, faces: FaceFiles) -> Result<(), Attempt> {
    let missing: Vec<&'static str> = if directory.is_dir() {
        faces
            .files
            .iter()
            .copied()
            .filter(|file| !directory.join(file).is_file())
            .collect()
    } else {
        Vec::new()
    };
    if directory.is_dir() && missing.is_empty() {
        Ok(())
    } else {
        Err(Attempt {
            directory: directory.to_path_buf(),
            missing,
        })
    }
}

fn locate(plan: Vec<(PathBuf, FaceFiles)>) -> Result<(PathBuf, FaceFiles), Vec<Attempt>> {
    let mut attempts = Vec::new();
    for (directory, faces) in plan {
        match check(&directory, faces) {
            Ok(()) => return Ok((directory, faces)),
            Err(attempt) => attempts.push(attempt),
        }
    }
    Err(attempts)
}

fn load_face(directory: &Path, file: &str) -> Result<FontData, Error> {
    let path = directory.join(file);
    FontData::load(&path, None).map_err(|err| {
        Error::new(
            format!("Failed to load font {}: {}", path.display(), err),
            io::Error::new(io::ErrorKind::InvalidData, err.to_string()),
        )
    })
}

/// Loads a four-face family from explicit file names in `directory`.
fn load_family(directory: &Path, faces: FaceFiles) -> Result<FontFamily<FontData>, Error> {
    let [regular, bold, italic, bold_italic] = faces.files;
    Ok(FontFamily {
        regular: load_face(directory, regular)?,
        bold: load_face(directory, bold)?,
        italic: load_face(directory, italic)?,
        bold_italic: load_face(directory, bold_italic)?,
    })
}

/// Returns the first font family found along the search order.
pub fn default_font_family() -> Result<FontFamily<FontData>, Error> {
    match locate(search_plan()) {
        Ok((directory, faces)) => {
            if faces.family != DEFAULT_FONT_FAMILY_NAME {
                warn!(
                    "{} fonts unavailable; falling back to '{}' from {}",
                    DEFAULT_FONT_FAMILY_NAME,
                    faces.family,
                    directory.display()
                );
            } else {
                debug!("Loading {} fonts from {}", faces.family, directory.display());
            }
            load_family(&directory, faces)
        }
        Err(attempts) => {
            let checked = attempts
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            Err(Error::new(
                format!("Unable to locate a usable font family. Checked: {checked}. Set {FONTS_DIR_ENV} to a directory containing the Roboto fonts."),
                io::Error::new(io::ErrorKind::NotFound, "no font family found"),
            ))
        }
    }
}

/// Indicates whether [`default_font_family`] can find a complete family.
pub fn default_fonts_available() -> bool {
    locate(search_plan()).is_ok()
}

/// Returns the first monospace family found along the search order.
///
/// A missing or unreadable family is not an error: code is then set in the body family.
pub fn monospace_font_family() -> Option<FontFamily<FontData>> {
    let (directory, faces) = match locate(monospace_plan()) {
        Ok(found) => found,
        Err(attempts) => {
            debug!(
                "No monospace font family found after {} locations; code uses the body font",
                attempts.len()
            );
            return None;
        }
    };
    match load_family(&directory, faces) {
        Ok(family) => {
            debug!("Loading {} fonts from {}", faces.family, directory.display());
            Some(family)
        }
        Err(err) => {
            warn!("{err}; code uses the body font");
            None
        }
    }
}

/// Returns whether `err` means that no fonts could be found, as opposed to broken font files.
pub fn fonts_missing(err: &Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::IoError(io_err)
            if io_err.kind() == io::ErrorKind::NotFound
                || io_err.kind() == io::ErrorKind::PermissionDenied
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_lists_missing_files() {
        let attempt = Attempt {
            directory: PathBuf::from("/fonts"),
            missing: vec!["Roboto-Bold.ttf"],
        };
        assert_eq!(attempt.to_string(), "/fonts (missing files [Roboto-Bold.ttf])");
    }

    #[test]
    fn incomplete_directory_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("Roboto-Regular.ttf"), b"").expect("write face");
        let attempt = check(dir.path(), ROBOTO).unwrap_err();
        assert_eq!(attempt.missing.len(), 3);
        assert!(check(&dir.path().join("absent"), ROBOTO).is_err());
    }

    #[test]
    fn bundled_directories_come_first() {
        let plan = search_plan();
        assert_eq!(plan[0].1.family, DEFAULT_FONT_FAMILY_NAME);
        assert!(plan
            .iter()
            .any(|(_, faces)| faces.family == SYSTEM_FAMILY_NAME));
    }

    #[test]
    fn monospace_search_mirrors_the_body_search() {
        let body = search_plan();
        let mono = monospace_plan();
        assert_eq!(body.len(), mono.len());
        assert_eq!(mono[0].1.family, "RobotoMono");
        assert!(mono.iter().any(|(_, faces)| faces.family == "LiberationMono"));
        assert!(body
            .iter()
            .zip(&mono)
            .all(|((body_dir, _), (mono_dir, _))| body_dir == mono_dir));
    }

    #[test]
    fn monospace_directory_needs_all_four_faces() {
        let dir = tempfile::tempdir().expect("temp dir");
        for file in &ROBOTO_MONO.files[..3] {
            std::fs::write(dir.path().join(file), b"").expect("write face");
        }
        let attempt = check(dir.path(), ROBOTO_MONO).unwrap_err();
        assert_eq!(attempt.missing, vec!["RobotoMono-BoldItalic.ttf"]);
    }

    #[test]
    fn missing_fonts_error_is_classified() {
        let err = Error::new(
            "no fonts",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert!(fonts_missing(&err));
    }
}
