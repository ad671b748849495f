//! Recognition engine seam.

use crate::Result;
use image::GrayImage;

/// Recognition parameters resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionParams {
    /// Languages in engine form, e.g. `eng+ind`.
    pub languages: String,
    pub dpi: u32,
    pub psm: i32,
    pub oem: i32,
}

/// Text and mean confidence (0..=100) returned by an engine for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    pub confidence: Option<f64>,
}

/// An OCR engine.
///
/// Backends are shared across documents processed in parallel, so they
/// must be `Send + Sync`. The image handed in has already been through the
/// preprocessing chain.
pub trait OcrBackend: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    fn recognize(&self, image: &GrayImage, params: &RecognitionParams) -> Result<RecognizedText>;
}
