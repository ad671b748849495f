//! File kind detection.
//!
//! Kinds are sniffed from magic bytes with `infer` first, so a mislabelled
//! upload is still routed correctly, then from the file extension.

use crate::types::{FileKind, ImageFormat};
use crate::{CvError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const DOCX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const ZIP_MIME_TYPE: &str = "application/zip";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";

static EXT_TO_KIND: Lazy<HashMap<&'static str, FileKind>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("pdf", FileKind::Pdf);
    m.insert("docx", FileKind::Docx);
    m.insert("txt", FileKind::PlainText);
    m.insert("text", FileKind::PlainText);
    m.insert("zip", FileKind::Zip);

    m.insert("png", FileKind::Image(ImageFormat::Png));
    m.insert("jpg", FileKind::Image(ImageFormat::Jpeg));
    m.insert("jpeg", FileKind::Image(ImageFormat::Jpeg));
    m.insert("tif", FileKind::Image(ImageFormat::Tiff));
    m.insert("tiff", FileKind::Image(ImageFormat::Tiff));
    m.insert("bmp", FileKind::Image(ImageFormat::Bmp));
    m.insert("webp", FileKind::Image(ImageFormat::Webp));
    m.insert("gif", FileKind::Image(ImageFormat::Gif));

    m
});

/// Maps a MIME type to a file kind.
pub fn kind_from_mime(mime_type: &str) -> Option<FileKind> {
    match mime_type {
        PDF_MIME_TYPE => Some(FileKind::Pdf),
        DOCX_MIME_TYPE => Some(FileKind::Docx),
        ZIP_MIME_TYPE | "application/x-zip-compressed" => Some(FileKind::Zip),
        PLAIN_TEXT_MIME_TYPE => Some(FileKind::PlainText),
        "image/png" => Some(FileKind::Image(ImageFormat::Png)),
        "image/jpeg" => Some(FileKind::Image(ImageFormat::Jpeg)),
        "image/tiff" => Some(FileKind::Image(ImageFormat::Tiff)),
        "image/bmp" => Some(FileKind::Image(ImageFormat::Bmp)),
        "image/webp" => Some(FileKind::Image(ImageFormat::Webp)),
        "image/gif" => Some(FileKind::Image(ImageFormat::Gif)),
        _ => None,
    }
}

/// Lowercased extension of a file name, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Detects the kind of a file from its extension alone.
///
/// # Errors
///
/// Returns `CvError::UnsupportedFormat` if the extension is unknown.
pub fn detect_kind_from_name(name: &str) -> Result<FileKind> {
    let extension = extension_of(name);

    if let Some(ext) = &extension
        && let Some(kind) = EXT_TO_KIND.get(ext.as_str())
    {
        return Ok(*kind);
    }

    if let Some(kind) = mime_guess::from_path(name)
        .first()
        .and_then(|mime| kind_from_mime(mime.essence_str()))
    {
        return Ok(kind);
    }

    match extension {
        Some(ext) => Err(CvError::UnsupportedFormat(format!("Unknown extension: .{}", ext))),
        None => Err(CvError::UnsupportedFormat(format!(
            "Could not determine file kind of {}",
            name
        ))),
    }
}

/// Detects the kind of a file from its content, falling back to its name.
///
/// Content sniffing wins over the extension. A ZIP container that `infer`
/// recognises as a Word document is reported as DOCX.
pub fn detect_kind(name: &str, bytes: &[u8]) -> Result<FileKind> {
    if let Some(sniffed) = infer::get(bytes)
        && let Some(kind) = kind_from_mime(sniffed.mime_type())
    {
        if kind == FileKind::Zip && extension_of(name).as_deref() == Some("docx") {
            return Ok(FileKind::Docx);
        }
        if kind != detect_kind_from_name(name).unwrap_or(kind) {
            tracing::debug!(name, sniffed = sniffed.mime_type(), "Content type differs from extension");
        }
        return Ok(kind);
    }

    detect_kind_from_name(name)
}
