//! Pipeline orchestration.
//!
//! - [`config`]: `PipelineConfig` and its TOML/YAML/JSON loaders
//! - [`mime`]: file kind detection from magic bytes and extensions
//! - [`loader`]: files, uploads and ZIP members into documents
//! - [`pipeline`]: the per-document pipeline and its builder
//! - `batch`: concurrent bulk processing (feature `tokio-runtime`)
//!
//! # Example
//!
//! ```rust,no_run
//! use cvinsight::core::config::PipelineConfig;
//! use cvinsight::core::pipeline::{Pipeline, ProcessOptions};
//!
//! # fn main() -> cvinsight::Result<()> {
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let record = pipeline.process_file("resume.pdf", &ProcessOptions::default())?;
//! println!("{:?}", record.personal_info.name);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "tokio-runtime")]
pub mod batch;
pub mod config;
pub mod loader;
pub mod mime;
pub mod pipeline;

pub use config::{
    AppConfig, LanguageDetectionConfig, ModelSpec, NlpConfig, OcrConfig, PipelineConfig, PreprocessingConfig,
    SkillsConfig,
};
pub use loader::{LoadedInput, collect_inputs, load_bytes, load_path};
pub use pipeline::{Pipeline, PipelineBuilder, ProcessOptions};
