use super::backend::{OcrBackend, RecognitionParams};
use super::preprocess::{prepare, scale_to_dpi};
use crate::core::config::OcrConfig;
use crate::extraction::{PdfText, docx};
use crate::types::{Document, FileKind, OcrResult, PageResult, TextSource};
use crate::{CvError, Result};
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

const DEFAULT_PSM: i32 = 6;
const DIRECT_TEXT_CONFIDENCE: f64 = 100.0;

fn strip_control_characters(text: &str) -> String {
    if text
        .chars()
        .any(|c| matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}') && !matches!(c, '\n' | '\r' | '\t'))
    {
        text.chars()
            .filter(|c| !matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}') || matches!(c, '\n' | '\r' | '\t'))
            .collect()
    } else {
        text.to_string()
    }
}

fn non_whitespace_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Recognition output for one page image.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub text: String,
    pub confidence: Option<f64>,
    pub blank: bool,
}

/// Turns a document into text, directly or through OCR.
///
/// Text-native formats are read directly first. When the direct text has
/// fewer than `min_text_length` non-whitespace characters the embedded page
/// images are recognized instead.
pub struct OcrProcessor {
    config: OcrConfig,
    params: RecognitionParams,
    backend: Option<Arc<dyn OcrBackend>>,
}

impl std::fmt::Debug for OcrProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrProcessor")
            .field("params", &self.params)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}

impl OcrProcessor {
    pub fn new(config: &OcrConfig, backend: Option<Arc<dyn OcrBackend>>) -> Self {
        let psm = if (0..=13).contains(&config.psm_mode) {
            config.psm_mode
        } else {
            tracing::warn!(
                psm = config.psm_mode,
                fallback = DEFAULT_PSM,
                "Invalid page segmentation mode, using fallback"
            );
            DEFAULT_PSM
        };

        let params = RecognitionParams {
            languages: config.language_string(),
            dpi: config.dpi,
            psm,
            oem: config.oem,
        };

        Self {
            config: config.clone(),
            params,
            backend,
        }
    }

    /// Build the processor with the engine named in `ocr.engine`.
    ///
    /// A missing engine is not an error here: documents that need OCR fail
    /// individually, while text-native documents keep working.
    pub fn from_config(config: &OcrConfig) -> Self {
        let backend = default_backend(config);
        Self::new(config, backend)
    }

    pub fn params(&self) -> &RecognitionParams {
        &self.params
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Extract text from a document.
    ///
    /// # Errors
    ///
    /// - `CvError::Parsing` when the bytes cannot be decoded as the declared kind
    /// - `CvError::Ocr` when a page has ink but no text can be recovered
    /// - `CvError::UnsupportedFormat` for archives, which the loader expands
    #[instrument(skip(self, document), fields(source = %document.source))]
    pub fn extract(&self, document: &Document) -> Result<OcrResult> {
        match document.kind {
            FileKind::PlainText => {
                let text = String::from_utf8_lossy(&document.bytes);
                let text = text.trim_start_matches('\u{feff}');
                Ok(OcrResult::direct(strip_control_characters(text)))
            }
            FileKind::Image(format) => {
                let image = image::load_from_memory_with_format(&document.bytes, format.as_image_format())?;
                let outcome = self.recognize_image(&image, 1, document.stem(), None)?;
                if !outcome.blank && outcome.text.trim().is_empty() {
                    return Err(CvError::ocr(format!(
                        "No text could be recovered from {}",
                        document.source
                    )));
                }
                Ok(OcrResult::from_pages(vec![PageResult {
                    page_number: 1,
                    text: outcome.text,
                    confidence: outcome.confidence,
                    source: TextSource::Ocr,
                }]))
            }
            FileKind::Pdf => self.extract_pdf(document),
            FileKind::Docx => self.extract_docx(document),
            FileKind::Zip => Err(CvError::UnsupportedFormat(format!(
                "{} is an archive; expand it with the loader first",
                document.source
            ))),
        }
    }

    fn extract_pdf(&self, document: &Document) -> Result<OcrResult> {
        let pdf = PdfText::load(&document.bytes)?;
        let direct = pdf.full_text();
        let direct_len = non_whitespace_len(&direct);

        if direct_len >= self.config.min_text_length {
            tracing::debug!(
                source = %document.source,
                chars = direct_len,
                "Using embedded PDF text"
            );
            return Ok(OcrResult::from_pages(
                pdf.pages
                    .iter()
                    .map(|page| PageResult {
                        page_number: page.number as usize,
                        text: strip_control_characters(&page.text),
                        confidence: Some(DIRECT_TEXT_CONFIDENCE),
                        source: TextSource::Direct,
                    })
                    .collect(),
            ));
        }

        tracing::debug!(
            source = %document.source,
            chars = direct_len,
            threshold = self.config.min_text_length,
            "Embedded PDF text below threshold, falling back to OCR"
        );

        let mut pages = Vec::with_capacity(pdf.pages.len());
        let mut had_ink = false;
        let mut undecodable = 0;

        for page in &pdf.pages {
            let images = pdf.page_images(page);
            undecodable += images.skipped;
            had_ink |= images.skipped > 0;
            if images.decoded.is_empty() {
                let text = strip_control_characters(&page.text);
                let confidence = (!text.trim().is_empty()).then_some(DIRECT_TEXT_CONFIDENCE);
                had_ink |= confidence.is_some();
                pages.push(PageResult {
                    page_number: page.number as usize,
                    text,
                    confidence,
                    source: TextSource::Direct,
                });
                continue;
            }

            let page_width_in = pdf.page_width(page) / 72.0;
            let mut texts = Vec::new();
            let mut confidences = Vec::new();
            for image in images.decoded {
                let source_dpi = image.width() as f32 / page_width_in;
                let outcome = self.recognize_image(&image, page.number as usize, document.stem(), Some(source_dpi))?;
                had_ink |= !outcome.blank;
                if !outcome.text.trim().is_empty() {
                    texts.push(outcome.text.trim().to_string());
                }
                confidences.extend(outcome.confidence);
            }

            let (text, source) = if texts.is_empty() && !page.text.trim().is_empty() {
                (strip_control_characters(&page.text), TextSource::Direct)
            } else {
                (texts.join("\n"), TextSource::Ocr)
            };
            let confidence = if source == TextSource::Direct {
                Some(DIRECT_TEXT_CONFIDENCE)
            } else if confidences.is_empty() {
                None
            } else {
                Some(confidences.iter().sum::<f64>() / confidences.len() as f64)
            };
            pages.push(PageResult {
                page_number: page.number as usize,
                text,
                confidence,
                source,
            });
        }

        let result = OcrResult::from_pages(pages);
        if had_ink && result.text.trim().is_empty() {
            let detail = if undecodable > 0 {
                format!(" ({} embedded images use unsupported encodings)", undecodable)
            } else {
                String::new()
            };
            return Err(CvError::ocr(format!(
                "No text could be recovered from {}{}",
                document.source, detail
            )));
        }
        Ok(result)
    }

    fn extract_docx(&self, document: &Document) -> Result<OcrResult> {
        let direct = strip_control_characters(&docx::extract_text(&document.bytes)?);
        let direct_len = non_whitespace_len(&direct);

        if direct_len >= self.config.min_text_length {
            tracing::debug!(source = %document.source, chars = direct_len, "Using embedded DOCX text");
            return Ok(OcrResult::direct(direct));
        }

        let images = docx::embedded_images(&document.bytes)?;
        if images.is_empty() {
            return Ok(OcrResult::direct(direct));
        }

        tracing::debug!(
            source = %document.source,
            chars = direct_len,
            images = images.len(),
            "Embedded DOCX text below threshold, recognizing media"
        );

        let mut pages = Vec::new();
        if !direct.trim().is_empty() {
            pages.push(PageResult {
                page_number: 1,
                text: direct,
                confidence: Some(DIRECT_TEXT_CONFIDENCE),
                source: TextSource::Direct,
            });
        }

        let mut had_ink = false;
        for image in images {
            let page_number = pages.len() + 1;
            let outcome = self.recognize_image(&image, page_number, document.stem(), None)?;
            had_ink |= !outcome.blank;
            pages.push(PageResult {
                page_number,
                text: outcome.text,
                confidence: outcome.confidence,
                source: TextSource::Ocr,
            });
        }

        let result = OcrResult::from_pages(pages);
        if had_ink && result.text.trim().is_empty() {
            return Err(CvError::ocr(format!(
                "No text could be recovered from {}",
                document.source
            )));
        }
        Ok(result)
    }

    /// Preprocess and recognize one page image.
    ///
    /// Blank pages short-circuit to empty text without calling the engine.
    /// `source_dpi` is the effective resolution of an image embedded in a
    /// page; images below `ocr.dpi` are upscaled first.
    pub fn recognize_image(
        &self,
        image: &DynamicImage,
        page: usize,
        stem: &str,
        source_dpi: Option<f32>,
    ) -> Result<PageOutcome> {
        let scaled;
        let image = match source_dpi {
            Some(dpi) => {
                scaled = scale_to_dpi(image.clone(), dpi, self.params.dpi);
                &scaled
            }
            None => image,
        };

        let prepared = prepare(image, &self.config.preprocessing);
        if prepared.skew_degrees != 0.0 {
            tracing::debug!(page, skew = prepared.skew_degrees, "Deskewed page");
        }

        if let Some(dir) = &self.config.debug_artifacts_dir {
            write_artifact(dir, stem, page, &prepared.image);
        }

        if prepared.blank {
            tracing::debug!(page, "Blank page, skipping recognition");
            return Ok(PageOutcome {
                text: String::new(),
                confidence: None,
                blank: true,
            });
        }

        let Some(backend) = &self.backend else {
            return Err(CvError::ocr(format!(
                "Page {} needs OCR but no engine is available (ocr.engine = '{}')",
                page, self.config.engine
            )));
        };

        let recognized = backend.recognize(&prepared.image, &self.params)?;
        tracing::debug!(
            page,
            engine = backend.name(),
            chars = recognized.text.len(),
            confidence = ?recognized.confidence,
            "Recognized page"
        );

        Ok(PageOutcome {
            text: strip_control_characters(recognized.text.trim()),
            confidence: recognized.confidence.filter(|c| *c >= 0.0),
            blank: false,
        })
    }
}

/// Engine selected by `ocr.engine`, if it is compiled in and usable.
pub fn default_backend(config: &OcrConfig) -> Option<Arc<dyn OcrBackend>> {
    match config.engine.to_lowercase().as_str() {
        "none" | "" => None,
        #[cfg(feature = "tesseract")]
        "tesseract" => match super::tesseract::TesseractBackend::new(&config.language_string()) {
            Ok(backend) => Some(Arc::new(backend)),
            Err(e) => {
                tracing::warn!(error = %e, "Tesseract unavailable, OCR disabled");
                None
            }
        },
        other => {
            tracing::warn!(engine = other, "OCR engine not available in this build, OCR disabled");
            None
        }
    }
}

/// Artifact names carry a fresh UUID so concurrent documents never collide.
fn write_artifact(dir: &Path, stem: &str, page: usize, image: &image::GrayImage) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::warn!(dir = %dir.display(), error = %e, "Cannot create artifact directory");
        return;
    }
    let safe_stem: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let path = dir.join(format!("{}-{}-p{}.png", uuid::Uuid::new_v4(), safe_stem, page));
    if let Err(e) = image.save(&path) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to write debug artifact");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::backend::RecognizedText;
    use image::{GrayImage, Luma};
    use parking_lot::Mutex;

    struct FixedBackend {
        text: &'static str,
        calls: Mutex<Vec<RecognitionParams>>,
    }

    impl OcrBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, _image: &GrayImage, params: &RecognitionParams) -> Result<RecognizedText> {
            self.calls.lock().push(params.clone());
            Ok(RecognizedText {
                text: self.text.to_string(),
                confidence: Some(91.0),
            })
        }
    }

    fn png_bytes(img: &GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn inked_image() -> GrayImage {
        let mut img = GrayImage::from_pixel(120, 60, Luma([255]));
        for y in 20..30 {
            for x in 10..110 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        img
    }

    #[test]
    fn test_invalid_psm_falls_back() {
        let config = OcrConfig {
            psm_mode: 42,
            ..OcrConfig::default()
        };
        let processor = OcrProcessor::new(&config, None);
        assert_eq!(processor.params().psm, 6);
    }

    #[test]
    fn test_params_follow_config() {
        let config = OcrConfig {
            languages: vec!["eng".into(), "ind".into()],
            dpi: 200,
            oem: 1,
            psm_mode: 4,
            ..OcrConfig::default()
        };
        let params = OcrProcessor::new(&config, None).params().clone();
        assert_eq!(
            params,
            RecognitionParams {
                languages: "eng+ind".to_string(),
                dpi: 200,
                psm: 4,
                oem: 1
            }
        );
    }

    #[test]
    fn test_blank_image_without_engine_is_empty_text() {
        let processor = OcrProcessor::new(&OcrConfig::default(), None);
        let blank = GrayImage::from_pixel(80, 80, Luma([255]));
        let doc = Document::new(
            "blank.png",
            png_bytes(&blank),
            FileKind::Image(crate::types::ImageFormat::Png),
        );

        let result = processor.extract(&doc).unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.mean_confidence, None);
    }

    #[test]
    fn test_inked_image_without_engine_is_ocr_failure() {
        let processor = OcrProcessor::new(&OcrConfig::default(), None);
        let doc = Document::new(
            "scan.png",
            png_bytes(&inked_image()),
            FileKind::Image(crate::types::ImageFormat::Png),
        );

        let err = processor.extract(&doc).unwrap_err();
        assert!(matches!(err, CvError::Ocr { .. }));
    }

    #[test]
    fn test_inked_image_uses_backend() {
        let backend = Arc::new(FixedBackend {
            text: "Jane Roe\u{0007}\nData Engineer",
            calls: Mutex::new(Vec::new()),
        });
        let processor = OcrProcessor::new(&OcrConfig::default(), Some(backend.clone()));
        let doc = Document::new(
            "scan.png",
            png_bytes(&inked_image()),
            FileKind::Image(crate::types::ImageFormat::Png),
        );

        let result = processor.extract(&doc).unwrap();
        assert_eq!(result.text, "Jane Roe\nData Engineer");
        assert_eq!(result.mean_confidence, Some(91.0));
        assert_eq!(result.source, TextSource::Ocr);
        assert_eq!(backend.calls.lock().len(), 1);
    }

    #[test]
    fn test_corrupt_image_is_parsing_error() {
        let processor = OcrProcessor::new(&OcrConfig::default(), None);
        let doc = Document::new(
            "broken.png",
            b"\x89PNG garbage".to_vec(),
            FileKind::Image(crate::types::ImageFormat::Png),
        );
        assert!(matches!(processor.extract(&doc), Err(CvError::Parsing { .. })));
    }

    #[test]
    fn test_plain_text_is_direct() {
        let processor = OcrProcessor::new(&OcrConfig::default(), None);
        let doc = Document::new("cv.txt", "\u{feff}Jane Roe".as_bytes().to_vec(), FileKind::PlainText);
        let result = processor.extract(&doc).unwrap();
        assert_eq!(result.text, "Jane Roe");
        assert_eq!(result.source, TextSource::Direct);
    }

    #[test]
    fn test_archive_is_rejected() {
        let processor = OcrProcessor::new(&OcrConfig::default(), None);
        let doc = Document::new("bundle.zip", Vec::<u8>::new(), FileKind::Zip);
        assert!(matches!(processor.extract(&doc), Err(CvError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_debug_artifacts_written_with_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig {
            debug_artifacts_dir: Some(dir.path().to_path_buf()),
            ..OcrConfig::default()
        };
        let processor = OcrProcessor::new(&config, None);
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, Luma([255])));

        processor.recognize_image(&blank, 1, "cv one", None).unwrap();
        processor.recognize_image(&blank, 1, "cv one", None).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.ends_with("-cv_one-p1.png")));
    }

    #[test]
    fn test_strip_control_characters() {
        assert_eq!(strip_control_characters("a\u{0000}b\tc\n"), "ab\tc\n");
        assert_eq!(strip_control_characters("plain"), "plain");
    }
}
