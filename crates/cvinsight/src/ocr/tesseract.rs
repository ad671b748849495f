//! Tesseract backend.
//!
//! A fresh `TesseractAPI` is initialised per image; the handle is not shared
//! between threads.

use super::backend::{OcrBackend, RecognitionParams, RecognizedText};
use crate::{CvError, Result};
use image::GrayImage;
use kreuzberg_tesseract::{TessPageSegMode, TesseractAPI};
use std::env;
use std::path::{Path, PathBuf};

const FALLBACK_TESSDATA_PATHS: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/opt/homebrew/opt/tesseract/share/tessdata",
    "/usr/local/opt/tesseract/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    r#"C:\Program Files\Tesseract-OCR\tessdata"#,
    r#"C:\ProgramData\Tesseract-OCR\tessdata"#,
];

#[derive(Debug, Clone)]
pub struct TesseractBackend {
    tessdata: PathBuf,
}

impl TesseractBackend {
    /// Resolve `tessdata` from `TESSDATA_PREFIX` or a common install path and
    /// check that every requested language pack exists.
    ///
    /// # Errors
    ///
    /// Returns `CvError::MissingDependency` when no tessdata directory or
    /// traineddata file is found.
    pub fn new(languages: &str) -> Result<Self> {
        let tessdata = env::var("TESSDATA_PREFIX")
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| {
                FALLBACK_TESSDATA_PATHS
                    .iter()
                    .find(|p| Path::new(p).exists())
                    .map(|p| (*p).to_string())
            })
            .map(PathBuf::from)
            .ok_or_else(|| CvError::MissingDependency("tessdata directory not found".to_string()))?;

        if languages.trim().is_empty() {
            return Err(CvError::validation("OCR language list cannot be empty"));
        }

        for lang in languages.split('+').map(str::trim).filter(|l| !l.is_empty()) {
            let traineddata = tessdata.join(format!("{}.traineddata", lang));
            if !traineddata.exists() {
                return Err(CvError::MissingDependency(format!(
                    "Tesseract language '{}' not found at {}",
                    lang,
                    traineddata.display()
                )));
            }
        }

        tracing::debug!(tessdata = %tessdata.display(), languages, "Tesseract backend ready");
        Ok(Self { tessdata })
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &GrayImage, params: &RecognitionParams) -> Result<RecognizedText> {
        let api = TesseractAPI::new();
        let datapath = self.tessdata.to_string_lossy();

        api.init(datapath.as_ref(), &params.languages)
            .map_err(|e| CvError::ocr(format!("Failed to initialize language '{}': {}", params.languages, e)))?;

        api.set_variable("tessedit_ocr_engine_mode", &params.oem.to_string())
            .map_err(|e| CvError::ocr(format!("Failed to set OEM: {}", e)))?;
        api.set_page_seg_mode(TessPageSegMode::from_int(params.psm))
            .map_err(|e| CvError::ocr(format!("Failed to set PSM mode: {}", e)))?;

        let (width, height) = image.dimensions();
        api.set_image(image.as_raw(), width as i32, height as i32, 1, width as i32)
            .map_err(|e| CvError::ocr(format!("Failed to set image: {}", e)))?;
        api.set_source_resolution(params.dpi as i32)
            .map_err(|e| CvError::ocr(format!("Failed to set resolution: {}", e)))?;

        api.recognize()
            .map_err(|e| CvError::ocr(format!("Failed to recognize text: {}", e)))?;

        let text = api
            .get_utf8_text()
            .map_err(|e| CvError::ocr(format!("Failed to extract text: {}", e)))?;
        let confidence = api.mean_text_conf().ok().filter(|c| *c >= 0).map(f64::from);

        Ok(RecognizedText { text, confidence })
    }
}
