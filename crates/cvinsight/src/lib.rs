//! cvinsight - resume and CV document pipeline.
//!
//! Turns PDFs, DOCX files, images and ZIP archives of resumes into
//! structured candidate records: contact details, skills, education, work
//! history, spoken languages, certifications and a summary.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cvinsight::{Pipeline, PipelineConfig, ProcessOptions};
//!
//! # fn main() -> cvinsight::Result<()> {
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let record = pipeline.process_file("resume.pdf", &ProcessOptions::default())?;
//! println!("{:?} <{:?}>", record.personal_info.name, record.personal_info.email);
//! println!("skills: {:?}", record.skill_names());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Loader** (`core::loader`): sniffs file kinds, expands ZIP archives
//! - **OCR** (`ocr`): direct text first, preprocessing plus OCR below a threshold
//! - **Language detection** (`language_detection`): whatlang with a short-text heuristic
//! - **NLP** (`nlp`): statistical or transformer entity recognition
//! - **Entities** (`entities`): strategy-based field extraction and validation
//! - **Batch** (`core::batch`): bounded parallel processing with failure markers

#![deny(unsafe_code)]

pub mod core;
pub mod entities;
pub mod error;
pub mod extraction;
pub mod language_detection;
pub mod nlp;
pub mod ocr;
pub mod stopwords;
pub mod types;

pub use error::{CvError, Result};
pub use types::*;

pub use core::config::{
    AppConfig, LanguageDetectionConfig, ModelSpec, NlpConfig, OcrConfig, PipelineConfig, PreprocessingConfig,
    SkillsConfig,
};
pub use core::loader::{load_bytes, load_path};
pub use core::pipeline::{Pipeline, PipelineBuilder, ProcessOptions};

#[cfg(feature = "tokio-runtime")]
pub use core::batch::{batch_process, batch_process_paths, batch_process_paths_sync, batch_process_sync};

pub use entities::{EntityExtractor, SkillsDictionary};
pub use language_detection::LanguageDetector;
pub use nlp::{NlpModel, NlpProcessor};
pub use ocr::{OcrBackend, OcrProcessor, RecognitionParams, RecognizedText};
