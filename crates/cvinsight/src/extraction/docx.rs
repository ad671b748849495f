//! DOCX (Microsoft Word) text extraction using docx-lite.
//!
//! Resumes exported from scanners are sometimes wrapped in a Word file with
//! a single picture per page. [`embedded_images`] pulls those pictures out of
//! `word/media/` so the OCR processor can read them.

use crate::error::{CvError, Result};
use image::DynamicImage;
use std::io::{Cursor, Read};

/// Largest embedded picture decoded for OCR.
const MAX_MEDIA_BYTES: u64 = 32 * 1024 * 1024;

/// Extract text from DOCX bytes using docx-lite.
///
/// # Errors
///
/// Returns `CvError::Parsing` when the bytes are not a readable DOCX package.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    docx_lite::extract_text_from_bytes(bytes)
        .map_err(|e| CvError::parsing(format!("DOCX text extraction failed: {}", e)))
}

/// Decode the raster pictures stored under `word/media/`, in archive order.
///
/// Vector formats (EMF/WMF/SVG) and unreadable entries are skipped.
pub fn embedded_images(bytes: &[u8]) -> Result<Vec<DynamicImage>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut images = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_lowercase();
        if !name.starts_with("word/media/") || file.is_dir() || file.size() > MAX_MEDIA_BYTES {
            continue;
        }

        let Ok(format) = image::ImageFormat::from_path(&name) else {
            continue;
        };

        let mut data = Vec::with_capacity(file.size() as usize);
        if let Err(e) = file.read_to_end(&mut data) {
            tracing::debug!(entry = %name, error = %e, "Failed to read DOCX media entry");
            continue;
        }

        match image::load_from_memory_with_format(&data, format) {
            Ok(img) => images.push(img),
            Err(e) => tracing::debug!(entry = %name, error = %e, "Skipping undecodable DOCX media"),
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    fn minimal_docx(paragraphs: &[&str], media: Option<&[u8]>) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut cursor);
            let options = FileOptions::<'_, ()>::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#,
            )
            .unwrap();

            let body: String = paragraphs
                .iter()
                .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
                .collect();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
                    body
                )
                .as_bytes(),
            )
            .unwrap();

            if let Some(png) = media {
                zip.start_file("word/media/image1.png", options).unwrap();
                zip.write_all(png).unwrap();
            }
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_extract_text_from_minimal_docx() {
        let bytes = minimal_docx(&["Jane Roe", "Data Engineer"], None);
        let text = extract_text(&bytes).unwrap();
        assert!(text.contains("Jane Roe"));
        assert!(text.contains("Data Engineer"));
    }

    #[test]
    fn test_embedded_images_decoded() {
        let mut png = Vec::new();
        image::GrayImage::from_pixel(8, 8, image::Luma([255]))
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let bytes = minimal_docx(&["scan"], Some(&png));

        let images = embedded_images(&bytes).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].width(), 8);
    }

    #[test]
    fn test_invalid_docx_is_parsing_error() {
        let err = extract_text(b"nope").unwrap_err();
        assert!(matches!(err, CvError::Parsing { .. }));
    }
}
