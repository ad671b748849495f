//! PDF text and embedded image extraction with `lopdf`.
//!
//! Scanned resumes are usually one image per page. Those images are pulled
//! out of the page resources so they can be OCR'd without a rasterizer.

use crate::error::{CvError, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::xobject::PdfImage;
use lopdf::{Document as PdfDocument, Object, ObjectId};

/// US Letter width, used when a page has no readable MediaBox.
const DEFAULT_PAGE_WIDTH_PT: f32 = 612.0;

/// One page of a loaded PDF.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub number: u32,
    pub id: ObjectId,
    pub text: String,
}

/// Raster images found on one page.
#[derive(Debug, Default)]
pub struct PageImages {
    pub decoded: Vec<DynamicImage>,
    /// Images present on the page whose encoding could not be decoded
    /// (CCITT, JBIG2, Indexed, ...). They still carry ink.
    pub skipped: usize,
}

impl PageImages {
    pub fn is_empty(&self) -> bool {
        self.decoded.is_empty() && self.skipped == 0
    }
}

/// A loaded PDF with per-page text.
pub struct PdfText {
    document: PdfDocument,
    pub pages: Vec<PdfPage>,
}

impl PdfText {
    /// Parse a PDF and extract the embedded text of every page.
    ///
    /// A page whose text cannot be decoded yields an empty string; the
    /// caller decides whether OCR should take over.
    ///
    /// # Errors
    ///
    /// Returns `CvError::Parsing` when the bytes are not a readable PDF.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let document = PdfDocument::load_mem(bytes)?;
        if document.is_encrypted() {
            return Err(CvError::parsing("Encrypted PDFs are not supported"));
        }

        let pages = document
            .get_pages()
            .into_iter()
            .map(|(number, id)| {
                let text = document.extract_text(&[number]).unwrap_or_else(|e| {
                    tracing::debug!(page = number, error = %e, "No extractable text on page");
                    String::new()
                });
                PdfPage { number, id, text }
            })
            .collect::<Vec<_>>();

        if pages.is_empty() {
            return Err(CvError::parsing("PDF has no pages"));
        }

        Ok(Self { document, pages })
    }

    /// Concatenated text of all pages, joined by a blank line.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Width of a page in points, from its MediaBox.
    pub fn page_width(&self, page: &PdfPage) -> f32 {
        let media_box = self
            .document
            .get_dictionary(page.id)
            .ok()
            .and_then(|dict| dict.get(b"MediaBox").ok())
            .and_then(|obj| match obj {
                Object::Reference(id) => self.document.get_object(*id).ok(),
                other => Some(other),
            })
            .and_then(|obj| obj.as_array().ok());

        match media_box {
            Some(values) if values.len() == 4 => {
                let nums: Vec<f32> = values.iter().filter_map(object_as_f32).collect();
                if nums.len() == 4 && nums[2] > nums[0] {
                    nums[2] - nums[0]
                } else {
                    DEFAULT_PAGE_WIDTH_PT
                }
            }
            _ => DEFAULT_PAGE_WIDTH_PT,
        }
    }

    /// Decode the raster images placed on a page.
    ///
    /// Supports uncompressed and Flate-compressed gray (8-bit or 1-bit),
    /// RGB and CMYK samples and DCT (JPEG) streams. Anything else is counted
    /// in [`PageImages::skipped`].
    pub fn page_images(&self, page: &PdfPage) -> PageImages {
        let images = match self.document.get_page_images(page.id) {
            Ok(images) => images,
            Err(e) => {
                tracing::debug!(page = page.number, error = %e, "Could not enumerate page images");
                return PageImages::default();
            }
        };

        let mut found = PageImages::default();
        for img in &images {
            match self.decode_image(img) {
                Some(image) => found.decoded.push(image),
                None => {
                    tracing::warn!(
                        page = page.number,
                        filters = ?img.filters,
                        color_space = ?img.color_space,
                        "Embedded image uses an unsupported encoding"
                    );
                    found.skipped += 1;
                }
            }
        }
        found
    }

    fn decode_image(&self, img: &PdfImage<'_>) -> Option<DynamicImage> {
        let filters = img.filters.clone().unwrap_or_default();
        if filters.iter().any(|f| f == "DCTDecode") {
            return image::load_from_memory_with_format(img.content, image::ImageFormat::Jpeg).ok();
        }

        let samples = if filters.is_empty() {
            img.content.to_vec()
        } else if filters.iter().all(|f| f == "FlateDecode") {
            self.document
                .get_object(img.id)
                .and_then(|obj| obj.as_stream())
                .and_then(|stream| stream.decompressed_content())
                .ok()?
        } else {
            return None;
        };
        raw_samples_to_image(
            samples,
            img.width,
            img.height,
            img.color_space.as_deref(),
            img.bits_per_component,
        )
    }
}

fn object_as_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn raw_samples_to_image(
    data: Vec<u8>,
    width: i64,
    height: i64,
    color_space: Option<&str>,
    bits_per_component: Option<i64>,
) -> Option<DynamicImage> {
    if width <= 0 || height <= 0 {
        return None;
    }
    let (w, h) = (width as u32, height as u32);
    let pixels = (w as usize).checked_mul(h as usize)?;

    match bits_per_component.unwrap_or(8) {
        8 => {}
        1 if matches!(color_space, Some("DeviceGray") | Some("CalGray") | None) => {
            return unpack_bilevel(&data, w, h).map(DynamicImage::ImageLuma8);
        }
        _ => return None,
    }

    match color_space {
        Some("DeviceGray") | Some("CalGray") | None if data.len() >= pixels => {
            let mut data = data;
            data.truncate(pixels);
            GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8)
        }
        Some("DeviceRGB") | Some("CalRGB") if data.len() >= pixels * 3 => {
            let mut data = data;
            data.truncate(pixels * 3);
            RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8)
        }
        Some("DeviceCMYK") if data.len() >= pixels * 4 => {
            let gray = data[..pixels * 4]
                .chunks_exact(4)
                .map(|px| {
                    let ink = 0.3 * px[0] as f32 + 0.59 * px[1] as f32 + 0.11 * px[2] as f32 + px[3] as f32;
                    255u8.saturating_sub(ink.min(255.0) as u8)
                })
                .collect();
            GrayImage::from_raw(w, h, gray).map(DynamicImage::ImageLuma8)
        }
        _ => None,
    }
}

/// Expand 1-bit samples (rows padded to whole bytes, 0 = black).
fn unpack_bilevel(data: &[u8], width: u32, height: u32) -> Option<GrayImage> {
    let row_bytes = (width as usize).div_ceil(8);
    if data.len() < row_bytes.checked_mul(height as usize)? {
        return None;
    }
    Some(GrayImage::from_fn(width, height, |x, y| {
        let byte = data[y as usize * row_bytes + x as usize / 8];
        let bit = (byte >> (7 - (x % 8))) & 1;
        image::Luma([if bit == 1 { 255 } else { 0 }])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_gray_samples() {
        let img = raw_samples_to_image(vec![255; 12], 4, 3, Some("DeviceGray"), Some(8)).unwrap();
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 3);
    }

    #[test]
    fn test_raw_rgb_samples_too_short() {
        assert!(raw_samples_to_image(vec![0; 10], 4, 3, Some("DeviceRGB"), Some(8)).is_none());
    }

    #[test]
    fn test_unsupported_bit_depth() {
        assert!(raw_samples_to_image(vec![0; 24], 4, 3, Some("DeviceGray"), Some(16)).is_none());
        assert!(raw_samples_to_image(vec![0; 12], 4, 3, Some("DeviceRGB"), Some(1)).is_none());
    }

    #[test]
    fn test_bilevel_samples() {
        // 10 pixels wide: two bytes per row, first pixel black, rest white.
        let data = vec![0b0111_1111, 0b1100_0000, 0b0111_1111, 0b1100_0000];
        let img = raw_samples_to_image(data, 10, 2, Some("DeviceGray"), Some(1)).unwrap().to_luma8();
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(1, 0).0[0], 255);
        assert_eq!(img.get_pixel(9, 1).0[0], 255);
    }

    #[test]
    fn test_cmyk_samples() {
        let data = vec![0, 0, 0, 255, 0, 0, 0, 0];
        let img = raw_samples_to_image(data, 2, 1, Some("DeviceCMYK"), Some(8)).unwrap().to_luma8();
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn test_load_garbage_is_parsing_error() {
        let err = PdfText::load(b"definitely not a pdf").err().unwrap();
        assert!(matches!(err, CvError::Parsing { .. }));
    }
}
