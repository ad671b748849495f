//! Per-document pipeline: text recovery, language detection, annotation and
//! field extraction.
//!
//! All process-wide state (OCR engine, NLP models, skills dictionary) is
//! built once by [`Pipeline::new`] or [`PipelineBuilder::build`] and shared
//! read-only by every document.

use crate::core::config::PipelineConfig;
use crate::core::loader::{load_bytes, load_path};
use crate::entities::{EntityExtractor, SkillsDictionary};
use crate::language_detection::LanguageDetector;
use crate::nlp::{NlpModel, NlpProcessor};
use crate::ocr::{OcrBackend, OcrProcessor, default_backend};
use crate::types::{AnnotationSet, Document, ExtractedRecord, LanguageDetection, TextSource};
use crate::{CvError, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// ISO 639-3 code that replaces language detection, e.g. `"ind"`.
    pub language: Option<String>,
}

impl ProcessOptions {
    pub fn with_language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
        }
    }
}

/// The configured pipeline. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    ocr: OcrProcessor,
    detector: LanguageDetector,
    nlp: NlpProcessor,
    extractor: EntityExtractor,
}

impl Pipeline {
    /// Build every component named in `config`.
    ///
    /// # Errors
    ///
    /// Fails when an NLP model cannot be loaded or a skills dictionary file
    /// is unreadable. A missing OCR engine is not an error; only documents
    /// that need OCR will fail.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        PipelineBuilder::new(config).build()
    }

    pub fn builder(config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn nlp(&self) -> &NlpProcessor {
        &self.nlp
    }

    pub fn ocr(&self) -> &OcrProcessor {
        &self.ocr
    }

    /// Run one document through every stage.
    ///
    /// # Errors
    ///
    /// Text recovery can fail a document (`CvError::Ocr`,
    /// `CvError::Parsing`, `CvError::UnsupportedFormat`), and so can
    /// `CvError::ResourceExhausted` from any stage. Ambiguous language and
    /// other NLP failures degrade into record warnings; missing fields are
    /// listed in `missing_fields`.
    #[instrument(skip(self, document, options), fields(source = %document.source, kind = %document.kind))]
    pub fn process_document(&self, document: &Document, options: &ProcessOptions) -> Result<ExtractedRecord> {
        let recovered = self.ocr.extract(document)?;
        let text = recovered.text.as_str();
        tracing::debug!(
            source_kind = ?recovered.source,
            chars = text.len(),
            "Text recovered"
        );

        let mut warnings = Vec::new();
        let detection = self.detect_language(text, options, &mut warnings);
        let annotations = self.annotate(text, &detection, &mut warnings)?;

        let mut record = self.extractor.extract(&document.source, text, &annotations);
        record.language = detection.label;
        record.language_confidence = detection.confidence;
        record.text_source = recovered.source;
        record.ocr_confidence = match recovered.source {
            TextSource::Direct => None,
            TextSource::Ocr | TextSource::Mixed => recovered.mean_confidence,
        };
        record.warnings.extend(warnings);

        tracing::debug!(
            language = %record.language,
            skills = record.skills.len(),
            missing = record.missing_fields.len(),
            "Document processed"
        );
        Ok(record)
    }

    /// Process an in-memory upload. ZIP archives must go through the bulk
    /// entry points.
    ///
    /// # Errors
    ///
    /// Returns `CvError::UnsupportedFormat` for archives and unknown kinds,
    /// plus the errors of [`Pipeline::process_document`].
    pub fn process_bytes(&self, name: &str, bytes: Vec<u8>, options: &ProcessOptions) -> Result<ExtractedRecord> {
        let document = self.single_document(load_bytes(name, bytes, &self.config.app)?.documents, name)?;
        self.process_document(&document, options)
    }

    /// Read and process a single file.
    ///
    /// # Errors
    ///
    /// As [`Pipeline::process_bytes`], plus `CvError::Io` when the file
    /// cannot be read.
    pub fn process_file(&self, path: impl AsRef<Path>, options: &ProcessOptions) -> Result<ExtractedRecord> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let document = self.single_document(load_path(path, &self.config.app)?.documents, &name)?;
        self.process_document(&document, options)
    }

    fn single_document(&self, mut documents: Vec<Document>, name: &str) -> Result<Document> {
        if documents.len() != 1 {
            return Err(CvError::UnsupportedFormat(format!(
                "{} expands to {} documents; use batch processing for archives",
                name,
                documents.len()
            )));
        }
        documents
            .pop()
            .ok_or_else(|| CvError::Other(format!("No document loaded from {}", name)))
    }

    fn detect_language(&self, text: &str, options: &ProcessOptions, warnings: &mut Vec<String>) -> LanguageDetection {
        let detection = match options.language.as_deref() {
            Some(code) => self.detector.override_with(code),
            None => self.detector.detect(text),
        };

        if detection.ambiguous {
            let err = CvError::ambiguous_language(format!(
                "best guess '{}' with confidence {:.2}",
                detection.label, detection.confidence
            ));
            tracing::warn!(error = %err, "Language detection ambiguous");
            warnings.push(err.to_string());
        }
        if detection.label.is_unknown() && !text.trim().is_empty() {
            warnings.push(format!(
                "Language unknown, using default '{}' pipeline",
                self.config.nlp.default_language
            ));
        }
        tracing::debug!(language = %detection.label, method = ?detection.method, "Language chosen");
        detection
    }

    fn annotate(
        &self,
        text: &str,
        detection: &LanguageDetection,
        warnings: &mut Vec<String>,
    ) -> Result<AnnotationSet> {
        match self.nlp.annotate(text, &detection.label) {
            Ok(annotations) => Ok(annotations),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "NLP annotation failed, continuing without entities");
                warnings.push(e.to_string());
                Ok(AnnotationSet::empty(detection.label.clone(), self.nlp.tier(), "unavailable"))
            }
        }
    }
}

/// Builds a [`Pipeline`] with optional injected components.
pub struct PipelineBuilder {
    config: PipelineConfig,
    backend: Option<Option<Arc<dyn OcrBackend>>>,
    models: Vec<(String, Arc<dyn NlpModel>)>,
    dictionary: Option<Arc<SkillsDictionary>>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field("custom_backend", &self.backend.is_some())
            .field("models", &self.models.iter().map(|(l, m)| (l, m.name())).collect::<Vec<_>>())
            .field("custom_dictionary", &self.dictionary.is_some())
            .finish()
    }
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            backend: None,
            models: Vec::new(),
            dictionary: None,
        }
    }

    /// Use `backend` instead of the engine named in `ocr.engine`.
    pub fn ocr_backend(mut self, backend: Arc<dyn OcrBackend>) -> Self {
        self.backend = Some(Some(backend));
        self
    }

    /// Run without any OCR engine.
    pub fn without_ocr(mut self) -> Self {
        self.backend = Some(None);
        self
    }

    /// Use `model` for `language`, replacing any configured one.
    pub fn nlp_model(mut self, language: impl Into<String>, model: Arc<dyn NlpModel>) -> Self {
        self.models.push((language.into(), model));
        self
    }

    pub fn skills_dictionary(mut self, dictionary: Arc<SkillsDictionary>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    /// # Errors
    ///
    /// See [`Pipeline::new`].
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config;

        let backend = self.backend.unwrap_or_else(|| default_backend(&config.ocr));
        let ocr = OcrProcessor::new(&config.ocr, backend);
        let detector = LanguageDetector::new(&config.app.supported_languages, &config.language_detection);

        let mut nlp = NlpProcessor::from_config(&config.nlp)?;
        for (language, model) in self.models {
            nlp.insert_model(&language, model);
        }

        let extractor = match self.dictionary {
            Some(dictionary) => EntityExtractor::new(dictionary, config.skills.clone()),
            None => EntityExtractor::from_config(&config.skills)?,
        };

        tracing::debug!(
            ocr = ?ocr,
            nlp = ?nlp,
            skills = extractor.dictionary().len(),
            "Pipeline ready"
        );

        Ok(Pipeline {
            config: Arc::new(config),
            ocr,
            detector,
            nlp,
            extractor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileKind;

    fn pipeline() -> Pipeline {
        Pipeline::builder(PipelineConfig::default()).without_ocr().build().unwrap()
    }

    fn text_document(text: &str) -> Document {
        Document::new("cv.txt", text.as_bytes().to_vec(), FileKind::PlainText)
    }

    #[test]
    fn test_process_plain_text() {
        let record = pipeline()
            .process_document(
                &text_document(
                    "John Doe\nEmail: john.doe@example.com\nPhone: +1-555-123-4567\n\nSkills\nRust, Python, Docker, Kubernetes\n\nSummary\nBackend engineer with ten years of experience building distributed systems and data platforms.",
                ),
                &ProcessOptions::default(),
            )
            .unwrap();

        assert_eq!(record.source, "cv.txt");
        assert_eq!(record.text_source, TextSource::Direct);
        assert_eq!(record.ocr_confidence, None);
        assert_eq!(record.personal_info.name.as_deref(), Some("John Doe"));
        assert_eq!(record.personal_info.email.as_deref(), Some("john.doe@example.com"));
        assert_eq!(record.personal_info.phone.as_deref(), Some("+1-555-123-4567"));
    }

    #[test]
    fn test_language_override() {
        let record = pipeline()
            .process_document(&text_document("Nama: Budi Santoso"), &ProcessOptions::with_language("ind"))
            .unwrap();
        assert_eq!(record.language.as_str(), "ind");
        assert_eq!(record.language_confidence, 1.0);
        assert_eq!(record.personal_info.name.as_deref(), Some("Budi Santoso"));
    }

    #[test]
    fn test_empty_text_yields_record() {
        let record = pipeline()
            .process_document(&text_document("   "), &ProcessOptions::default())
            .unwrap();
        assert!(record.language.is_unknown());
        assert!(record.skills.is_empty());
        assert!(record.missing_fields.contains(&"name".to_string()));
    }

    #[test]
    fn test_process_bytes_rejects_disabled_format() {
        let mut config = PipelineConfig::default();
        config.app.supported_formats = vec!["pdf".to_string()];
        let pipeline = Pipeline::builder(config).without_ocr().build().unwrap();
        let err = pipeline
            .process_bytes("cv.txt", b"John Doe".to_vec(), &ProcessOptions::default())
            .unwrap_err();
        assert!(matches!(err, CvError::UnsupportedFormat(_)));
    }
}
