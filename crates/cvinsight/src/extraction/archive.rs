//! ZIP archive expansion.
//!
//! An archive is never processed as a document itself: the loader unpacks it
//! into one [`Document`] per supported member.

use crate::core::config::AppConfig;
use crate::core::mime::{detect_kind, extension_of};
use crate::error::{CvError, Result};
use crate::types::{Document, FileKind};
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Documents unpacked from an archive plus the members that could not be read.
#[derive(Debug, Default)]
pub struct ArchiveExpansion {
    pub documents: Vec<Document>,
    pub failures: Vec<(String, CvError)>,
    pub skipped: Vec<String>,
}

/// Unpack every supported member of a ZIP archive.
///
/// Directories, nested archives and members whose extension is not in
/// `app.supported_formats` are skipped. Members larger than
/// `app.max_archive_entry_bytes` and members that fail to decompress are
/// reported in `failures` so the caller can emit a marker for each.
///
/// # Errors
///
/// Returns `CvError::Parsing` if the archive itself cannot be opened.
pub fn expand_zip(archive_name: &str, bytes: &[u8], app: &AppConfig) -> Result<ArchiveExpansion> {
    let cursor = Cursor::new(bytes);
    let mut archive = ZipArchive::new(cursor)
        .map_err(|e| CvError::parsing(format!("Failed to read ZIP archive {}: {}", archive_name, e)))?;

    let mut expansion = ArchiveExpansion::default();

    for i in 0..archive.len() {
        let mut file = match archive.by_index(i) {
            Ok(file) => file,
            Err(e) => {
                let source = format!("{}#{}", archive_name, i);
                tracing::warn!(archive = archive_name, index = i, error = %e, "Unreadable ZIP entry");
                expansion
                    .failures
                    .push((source, CvError::parsing(format!("Failed to read ZIP entry: {}", e))));
                continue;
            }
        };

        if file.is_dir() {
            continue;
        }

        let Some(member) = file.enclosed_name().map(|p| p.to_string_lossy().replace('\\', "/")) else {
            tracing::warn!(archive = archive_name, name = file.name(), "Skipping ZIP entry with unsafe path");
            expansion.skipped.push(file.name().to_string());
            continue;
        };
        let source = format!("{}/{}", archive_name, member);

        let Some(ext) = extension_of(&member) else {
            tracing::debug!(member, "Skipping ZIP entry without extension");
            expansion.skipped.push(source);
            continue;
        };

        if ext == "zip" {
            tracing::warn!(member, "Skipping nested archive");
            expansion.skipped.push(source);
            continue;
        }

        if !app.accepts_extension(&ext) {
            tracing::debug!(member, "Skipping unsupported archive member");
            expansion.skipped.push(source);
            continue;
        }

        if file.size() > app.max_archive_entry_bytes {
            expansion.failures.push((
                source,
                CvError::validation(format!(
                    "Archive member {} is {} bytes, limit is {}",
                    member,
                    file.size(),
                    app.max_archive_entry_bytes
                )),
            ));
            continue;
        }

        let mut content = Vec::with_capacity(file.size() as usize);
        let read = (&mut file)
            .take(app.max_archive_entry_bytes.saturating_add(1))
            .read_to_end(&mut content);
        if let Err(e) = read {
            tracing::warn!(member, error = %e, "Failed to decompress archive member");
            expansion
                .failures
                .push((source, CvError::parsing_with_source("Failed to decompress archive member", e)));
            continue;
        }
        if content.len() as u64 > app.max_archive_entry_bytes {
            expansion.failures.push((
                source,
                CvError::validation(format!("Archive member {} exceeds the size limit", member)),
            ));
            continue;
        }

        match detect_kind(&member, &content) {
            Ok(FileKind::Zip) => {
                tracing::warn!(member, "Skipping nested archive");
                expansion.skipped.push(source);
            }
            Ok(kind) => expansion.documents.push(Document::new(source, content, kind)),
            Err(e) => expansion.failures.push((source, e)),
        }
    }

    tracing::debug!(
        archive = archive_name,
        documents = expansion.documents.len(),
        failures = expansion.failures.len(),
        skipped = expansion.skipped.len(),
        "Expanded archive"
    );

    Ok(expansion)
}
