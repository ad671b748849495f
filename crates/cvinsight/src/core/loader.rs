//! Input loading.
//!
//! Resolves files, raw uploads and archive members into [`Document`]s with a
//! sniffed [`FileKind`]. ZIP archives expand into their members here, so the
//! rest of the pipeline only ever sees single documents.

use crate::core::config::AppConfig;
use crate::core::mime::{detect_kind, extension_of};
use crate::extraction::archive::expand_zip;
use crate::types::{Document, FileKind};
use crate::{CvError, Result};
use std::path::{Path, PathBuf};

/// Documents resolved from one input, plus members that failed to load.
#[derive(Debug, Default)]
pub struct LoadedInput {
    pub documents: Vec<Document>,
    pub failures: Vec<(String, CvError)>,
}

/// Resolve raw bytes into documents.
///
/// # Errors
///
/// Returns `CvError::UnsupportedFormat` if the extension is not listed in
/// `app.supported_formats` or the kind cannot be determined, and
/// `CvError::Parsing` if a ZIP archive cannot be opened.
pub fn load_bytes(name: &str, bytes: Vec<u8>, app: &AppConfig) -> Result<LoadedInput> {
    if let Some(ext) = extension_of(name)
        && !app.accepts_extension(&ext)
    {
        return Err(CvError::UnsupportedFormat(format!(
            "File type .{} is not enabled in app.supported_formats",
            ext
        )));
    }

    let kind = detect_kind(name, &bytes)?;
    if kind == FileKind::Zip {
        let expansion = expand_zip(name, &bytes, app)?;
        return Ok(LoadedInput {
            documents: expansion.documents,
            failures: expansion.failures,
        });
    }

    Ok(LoadedInput {
        documents: vec![Document::new(name, bytes, kind)],
        failures: Vec::new(),
    })
}

/// Read a file from disk and resolve it into documents.
///
/// The document source is the file name, not the full path.
///
/// # Errors
///
/// Returns `CvError::Io` when the file cannot be read, plus the errors of
/// [`load_bytes`].
pub fn load_path(path: impl AsRef<Path>, app: &AppConfig) -> Result<LoadedInput> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    load_bytes(&source_name(path), bytes, app)
}

/// Display name used as a document source.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// List the files of a directory whose extension is supported, sorted by name.
///
/// Only the top level is scanned.
pub fn collect_inputs(dir: impl AsRef<Path>, app: &AppConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| app.accepts_extension(e));
        if supported {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_bytes_plain_text() {
        let loaded = load_bytes("cv.txt", b"Jane Roe".to_vec(), &AppConfig::default()).unwrap();
        assert_eq!(loaded.documents.len(), 1);
        assert_eq!(loaded.documents[0].kind, FileKind::PlainText);
        assert_eq!(&*loaded.documents[0].bytes, b"Jane Roe");
    }

    #[test]
    fn test_disabled_format_rejected() {
        let app = AppConfig {
            supported_formats: vec!["pdf".to_string()],
            ..AppConfig::default()
        };
        let err = load_bytes("cv.txt", b"x".to_vec(), &app).unwrap_err();
        assert!(matches!(err, CvError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_path_missing_file_is_io() {
        let err = load_path("/nonexistent/cv.pdf", &AppConfig::default()).unwrap_err();
        assert!(matches!(err, CvError::Io(_)));
    }

    #[test]
    fn test_collect_inputs_filters_and_sorts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.pdf"), b"").unwrap();
        fs::write(dir.path().join("a.docx"), b"").unwrap();
        fs::write(dir.path().join("notes.exe"), b"").unwrap();
        fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let files = collect_inputs(dir.path(), &AppConfig::default()).unwrap();
        let names: Vec<String> = files.iter().map(|p| source_name(p)).collect();
        assert_eq!(names, vec!["a.docx", "b.pdf"]);
    }
}
