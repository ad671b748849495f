//! Error types for cvinsight.
//!
//! Every fallible operation in the crate returns [`CvError`] through the
//! [`Result`] alias. The variants follow the pipeline's failure taxonomy:
//!
//! - `UnsupportedFormat` - the loader rejected the file kind
//! - `Ocr` - no text could be recovered after preprocessing
//! - `LanguageDetectionAmbiguous` - detection was inconclusive (non-fatal)
//! - `ExtractionFieldMissing` - a record field stayed empty (non-fatal)
//!
//! Per-document failures never abort a batch. Only `ResourceExhausted`
//! is treated as fatal by the bulk orchestrator, see [`CvError::is_fatal`].
//!
//! # Example
//!
//! ```rust
//! use cvinsight::{CvError, Result};
//!
//! fn read_resume(path: &str) -> Result<Vec<u8>> {
//!     let bytes = std::fs::read(path)?;
//!     if bytes.is_empty() {
//!         return Err(CvError::validation(format!("File is empty: {}", path)));
//!     }
//!     Ok(bytes)
//! }
//! ```
use thiserror::Error;

/// Result type alias using `CvError`.
pub type Result<T> = std::result::Result<T, CvError>;

/// Main error type for all cvinsight operations.
#[derive(Debug, Error)]
pub enum CvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Language detection ambiguous: {message}")]
    LanguageDetectionAmbiguous { message: String },

    #[error("Extraction field missing: {field}")]
    ExtractionFieldMissing { field: String },

    #[error("NLP error: {message}")]
    Nlp {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Processing timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// A worker panicked while processing one document.
    #[error("Processing panicked: {0}")]
    Panic(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for CvError {
    fn from(err: serde_json::Error) -> Self {
        CvError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<zip::result::ZipError> for CvError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io) => CvError::Io(io),
            other => CvError::Parsing {
                message: format!("Invalid ZIP archive: {}", other),
                source: Some(Box::new(other)),
            },
        }
    }
}

impl From<lopdf::Error> for CvError {
    fn from(err: lopdf::Error) -> Self {
        CvError::Parsing {
            message: format!("Invalid PDF: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<image::ImageError> for CvError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Limits(limit) => CvError::Validation {
                message: format!("Image exceeds decoding limits: {}", limit),
                source: Some(Box::new(limit)),
            },
            other => CvError::Parsing {
                message: format!("Failed to decode image: {}", other),
                source: Some(Box::new(other)),
            },
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl CvError {
    error_constructor!(ocr, Ocr);
    error_constructor!(parsing, Parsing);
    error_constructor!(nlp, Nlp);
    error_constructor!(validation, Validation);
    error_constructor!(serialization, Serialization);

    pub fn ambiguous_language<S: Into<String>>(message: S) -> Self {
        Self::LanguageDetectionAmbiguous {
            message: message.into(),
        }
    }

    pub fn field_missing<S: Into<String>>(field: S) -> Self {
        Self::ExtractionFieldMissing { field: field.into() }
    }

    /// Stable snake_case name of the variant, used in batch failure markers.
    pub fn kind(&self) -> &'static str {
        match self {
            CvError::Io(_) => "io",
            CvError::UnsupportedFormat(_) => "unsupported_format",
            CvError::Ocr { .. } => "ocr_failure",
            CvError::Parsing { .. } => "parsing",
            CvError::LanguageDetectionAmbiguous { .. } => "language_detection_ambiguous",
            CvError::ExtractionFieldMissing { .. } => "extraction_field_missing",
            CvError::Nlp { .. } => "nlp",
            CvError::Validation { .. } => "validation",
            CvError::Serialization { .. } => "serialization",
            CvError::MissingDependency(_) => "missing_dependency",
            CvError::ResourceExhausted(_) => "resource_exhausted",
            CvError::Timeout { .. } => "timeout",
            CvError::Panic(_) => "panic",
            CvError::Other(_) => "other",
        }
    }

    /// Whether the error must abort a batch instead of becoming a per-document marker.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CvError::ResourceExhausted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CvError = io_err.into();
        assert!(matches!(err, CvError::Io(_)));
        assert!(err.to_string().contains("IO error"));
        assert_eq!(err.kind(), "io");
    }

    #[test]
    fn test_ocr_error() {
        let err = CvError::ocr("no text recovered");
        assert_eq!(err.to_string(), "OCR error: no text recovered");
        assert_eq!(err.kind(), "ocr_failure");
    }

    #[test]
    fn test_parsing_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad data");
        let err = CvError::parsing_with_source("invalid format", source);
        assert_eq!(err.to_string(), "Parsing error: invalid format");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_nlp_error_with_source() {
        let source = std::io::Error::other("session failed");
        let err = CvError::nlp_with_source("inference failed", source);
        assert_eq!(err.to_string(), "NLP error: inference failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unsupported_format_error() {
        let err = CvError::UnsupportedFormat("application/x-msdownload".to_string());
        assert_eq!(err.to_string(), "Unsupported format: application/x-msdownload");
        assert_eq!(err.kind(), "unsupported_format");
    }

    #[test]
    fn test_non_fatal_taxonomy() {
        let ambiguous = CvError::ambiguous_language("confidence 0.12");
        let missing = CvError::field_missing("phone");
        assert_eq!(ambiguous.to_string(), "Language detection ambiguous: confidence 0.12");
        assert_eq!(missing.to_string(), "Extraction field missing: phone");
        assert!(!ambiguous.is_fatal());
        assert!(!missing.is_fatal());
    }

    #[test]
    fn test_only_resource_exhaustion_is_fatal() {
        assert!(CvError::ResourceExhausted("model allocation".to_string()).is_fatal());
        assert!(!CvError::ocr("x").is_fatal());
        assert!(!CvError::Timeout { seconds: 5 }.is_fatal());
        assert!(!CvError::UnsupportedFormat("x".to_string()).is_fatal());
    }

    #[test]
    fn test_image_limits_stay_with_the_document() {
        let limit = image::error::LimitError::from_kind(image::error::LimitErrorKind::DimensionError);
        let err: CvError = image::ImageError::Limits(limit).into();
        assert_eq!(err.kind(), "validation");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_panic_is_not_fatal() {
        let err = CvError::Panic("engine crashed".to_string());
        assert_eq!(err.kind(), "panic");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_timeout_display() {
        let err = CvError::Timeout { seconds: 30 };
        assert_eq!(err.to_string(), "Processing timed out after 30s");
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: CvError = json_err.into();
        assert!(matches!(err, CvError::Serialization { .. }));
    }

    #[test]
    fn test_zip_error_conversion() {
        let err: CvError = zip::result::ZipError::InvalidArchive("bad".into()).into();
        assert!(matches!(err, CvError::Parsing { .. }));
        assert!(err.to_string().contains("Invalid ZIP archive"));
    }

    #[test]
    fn test_io_error_bubbles_unchanged() {
        fn read_file() -> Result<Vec<u8>> {
            Ok(std::fs::read("/nonexistent/resume.pdf")?)
        }
        assert!(matches!(read_file(), Err(CvError::Io(_))));
    }
}
