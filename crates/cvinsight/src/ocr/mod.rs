//! Text recovery: direct extraction for text-native formats, OCR for images
//! and scanned pages.
//!
//! - [`preprocess`]: deskew, denoise, adaptive threshold and binarization
//! - [`backend`]: the [`OcrBackend`] trait engines implement
//! - [`processor`]: chooses between direct text and OCR per document

pub mod backend;
pub mod preprocess;
pub mod processor;
#[cfg(feature = "tesseract")]
pub mod tesseract;

pub use backend::{OcrBackend, RecognitionParams, RecognizedText};
pub use processor::{OcrProcessor, PageOutcome, default_backend};
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractBackend;
