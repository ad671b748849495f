//! Configuration loading and management.
//!
//! The pipeline is configured once at startup from a TOML, YAML or JSON file
//! (or programmatically) and the resulting [`PipelineConfig`] is shared
//! read-only by every document run.

use crate::{CvError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main pipeline configuration.
///
/// # Example
///
/// ```rust
/// use cvinsight::core::config::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.ocr.dpi, 300);
///
/// // let config = PipelineConfig::from_toml_file("cvinsight.toml")?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default)]
    pub language_detection: LanguageDetectionConfig,

    #[serde(default)]
    pub nlp: NlpConfig,

    #[serde(default)]
    pub skills: SkillsConfig,
}

/// Application-level options: accepted inputs and bulk limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// File extensions the loader accepts (lowercase, without dot).
    #[serde(default = "default_supported_formats")]
    pub supported_formats: Vec<String>,

    /// ISO 639-3 codes the language detector may return.
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,

    /// Maximum documents processed concurrently in bulk mode (None = num_cpus * 2).
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Per-document timeout in bulk mode. A document exceeding it is reported as failed.
    #[serde(default)]
    pub document_timeout_secs: Option<u64>,

    /// Archive members larger than this are rejected.
    #[serde(default = "default_max_archive_entry_bytes")]
    pub max_archive_entry_bytes: u64,
}

/// OCR configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Recognition engine: `tesseract` or `none`.
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Tesseract language packs, joined with `+` when handed to the engine.
    #[serde(default = "default_ocr_languages")]
    pub languages: Vec<String>,

    #[serde(default = "default_dpi")]
    pub dpi: u32,

    /// OCR engine mode (0 legacy, 1 LSTM, 2 both, 3 default).
    #[serde(default = "default_oem")]
    pub oem: i32,

    /// Page segmentation mode, 0..=13. Out-of-range values fall back to 6.
    #[serde(default = "default_psm")]
    pub psm_mode: i32,

    /// Minimum non-whitespace characters of directly extracted text before
    /// falling back to OCR for PDF/DOCX.
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,

    /// Where to write preprocessed page images. Nothing is written when unset.
    #[serde(default)]
    pub debug_artifacts_dir: Option<PathBuf>,

    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    #[serde(default = "default_true")]
    pub deskew: bool,

    #[serde(default = "default_true")]
    pub denoise: bool,

    #[serde(default = "default_true")]
    pub adaptive_threshold: bool,

    #[serde(default = "default_true")]
    pub binarization: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDetectionConfig {
    /// Statistical detections below this confidence are ambiguous.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Texts shorter than this (in characters) use the stopword heuristic.
    #[serde(default = "default_short_text_threshold")]
    pub short_text_threshold: usize,
}

/// Model identifiers for one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Directory holding `model.onnx`, `tokenizer.json` and `config.json`.
    #[serde(default)]
    pub transformer: Option<String>,

    /// Statistical model identifier. `builtin` selects the bundled lexicons.
    #[serde(default = "default_small_model")]
    pub small: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NlpConfig {
    #[serde(default)]
    pub use_transformer: bool,

    /// Language whose model is used when the detected language has none.
    #[serde(default = "default_nlp_language")]
    pub default_language: String,

    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,

    #[serde(default = "default_models")]
    pub models: BTreeMap<String, ModelSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillsConfig {
    /// Minimum similarity in 0.0..=1.0 for a fuzzy skill match.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Candidates shorter than this many characters only match exactly.
    #[serde(default = "default_min_fuzzy_length")]
    pub min_fuzzy_length: usize,

    /// Longest word n-gram compared against the dictionary.
    #[serde(default = "default_max_ngram")]
    pub max_ngram: usize,

    /// Extra dictionary files per language code, merged over the built-in list.
    #[serde(default)]
    pub dictionaries: BTreeMap<String, PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_supported_formats() -> Vec<String> {
    ["pdf", "docx", "png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp", "txt", "zip"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_supported_languages() -> Vec<String> {
    vec!["eng".to_string(), "ind".to_string()]
}

fn default_max_archive_entry_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_engine() -> String {
    "tesseract".to_string()
}

fn default_ocr_languages() -> Vec<String> {
    vec!["eng".to_string(), "ind".to_string()]
}

fn default_dpi() -> u32 {
    300
}

fn default_oem() -> i32 {
    3
}

fn default_psm() -> i32 {
    3
}

fn default_min_text_length() -> usize {
    64
}

fn default_min_confidence() -> f64 {
    0.5
}

fn default_short_text_threshold() -> usize {
    40
}

fn default_small_model() -> String {
    "builtin".to_string()
}

fn default_nlp_language() -> String {
    "eng".to_string()
}

fn default_max_sequence_length() -> usize {
    512
}

fn default_models() -> BTreeMap<String, ModelSpec> {
    let mut models = BTreeMap::new();
    models.insert(
        "eng".to_string(),
        ModelSpec {
            transformer: Some("models/eng-ner".to_string()),
            small: default_small_model(),
        },
    );
    models.insert(
        "ind".to_string(),
        ModelSpec {
            transformer: Some("models/ind-ner".to_string()),
            small: default_small_model(),
        },
    );
    models
}

fn default_fuzzy_threshold() -> f64 {
    0.85
}

fn default_min_fuzzy_length() -> usize {
    4
}

fn default_max_ngram() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supported_formats: default_supported_formats(),
            supported_languages: default_supported_languages(),
            max_concurrent: None,
            document_timeout_secs: None,
            max_archive_entry_bytes: default_max_archive_entry_bytes(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            languages: default_ocr_languages(),
            dpi: default_dpi(),
            oem: default_oem(),
            psm_mode: default_psm(),
            min_text_length: default_min_text_length(),
            debug_artifacts_dir: None,
            preprocessing: PreprocessingConfig::default(),
        }
    }
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            deskew: true,
            denoise: true,
            adaptive_threshold: true,
            binarization: true,
        }
    }
}

impl Default for LanguageDetectionConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            short_text_threshold: default_short_text_threshold(),
        }
    }
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            transformer: None,
            small: default_small_model(),
        }
    }
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            use_transformer: false,
            default_language: default_nlp_language(),
            max_sequence_length: default_max_sequence_length(),
            models: default_models(),
        }
    }
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            min_fuzzy_length: default_min_fuzzy_length(),
            max_ngram: default_max_ngram(),
            dictionaries: BTreeMap::new(),
        }
    }
}

impl OcrConfig {
    /// Language string in the engine's `eng+ind` form.
    pub fn language_string(&self) -> String {
        if self.languages.is_empty() {
            return "eng".to_string();
        }
        self.languages.join("+")
    }
}

impl AppConfig {
    pub fn accepts_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.supported_formats.iter().any(|f| f.eq_ignore_ascii_case(&ext))
    }

    pub fn supports_language(&self, code: &str) -> bool {
        self.supported_languages.iter().any(|l| l.eq_ignore_ascii_case(code))
    }

    pub fn concurrency(&self) -> usize {
        self.max_concurrent.unwrap_or_else(|| num_cpus::get() * 2).max(1)
    }
}

const DISCOVERY_NAMES: &[&str] = &["cvinsight.toml", "cvinsight.yaml", "cvinsight.yml", "cvinsight.json"];

impl PipelineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `CvError::Validation` if the file cannot be read or is invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| CvError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| CvError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| CvError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration choosing the parser from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Self::from_toml_file(path),
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            other => Err(CvError::validation(format!(
                "Unsupported config format '{}' for {}",
                other,
                path.display()
            ))),
        }
    }

    /// Discover a configuration file in the current or a parent directory.
    ///
    /// Looks for `cvinsight.toml`, `cvinsight.yaml`, `cvinsight.yml` and
    /// `cvinsight.json`, in that order, at each level.
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(CvError::Io)?;

        loop {
            for name in DISCOVERY_NAMES {
                let candidate = current.join(name);
                if candidate.exists() {
                    tracing::debug!(path = %candidate.display(), "Discovered configuration file");
                    return Ok(Some(Self::from_file(candidate)?));
                }
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| CvError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.ocr.engine, "tesseract");
        assert_eq!(config.ocr.dpi, 300);
        assert_eq!(config.ocr.psm_mode, 3);
        assert_eq!(config.ocr.min_text_length, 64);
        assert!(config.ocr.preprocessing.deskew);
        assert!(!config.nlp.use_transformer);
        assert_eq!(config.app.supported_languages, vec!["eng", "ind"]);
        assert!(config.nlp.models.contains_key("eng"));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("cvinsight.toml");

        fs::write(
            &config_path,
            r#"
[ocr]
engine = "none"
languages = ["eng"]
dpi = 200
psm_mode = 6

[ocr.preprocessing]
deskew = false

[nlp]
use_transformer = true

[nlp.models.eng]
transformer = "models/bert-ner"

[skills]
fuzzy_threshold = 0.9
        "#,
        )
        .unwrap();

        let config = PipelineConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(config.ocr.engine, "none");
        assert_eq!(config.ocr.dpi, 200);
        assert_eq!(config.ocr.psm_mode, 6);
        assert_eq!(config.ocr.oem, 3);
        assert!(!config.ocr.preprocessing.deskew);
        assert!(config.ocr.preprocessing.binarization);
        assert!(config.nlp.use_transformer);
        assert_eq!(config.nlp.models["eng"].transformer.as_deref(), Some("models/bert-ner"));
        assert_eq!(config.nlp.models["eng"].small, "builtin");
        assert!(!config.nlp.models.contains_key("ind"));
        assert_eq!(config.skills.fuzzy_threshold, 0.9);
        assert_eq!(config.skills.max_ngram, 4);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("cvinsight.yaml");
        fs::write(
            &config_path,
            "app:\n  supported_languages: [eng]\n  max_concurrent: 3\nocr:\n  languages: [ind]\n",
        )
        .unwrap();

        let config = PipelineConfig::from_file(&config_path).unwrap();
        assert_eq!(config.app.supported_languages, vec!["eng"]);
        assert_eq!(config.app.concurrency(), 3);
        assert_eq!(config.ocr.language_string(), "ind");
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("cvinsight.json");
        fs::write(&config_path, r#"{"app": {"document_timeout_secs": 30}}"#).unwrap();

        let config = PipelineConfig::from_file(&config_path).unwrap();
        assert_eq!(config.app.document_timeout_secs, Some(30));
        assert_eq!(config.ocr.language_string(), "eng+ind");
    }

    #[test]
    fn test_invalid_toml_is_validation_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("broken.toml");
        fs::write(&config_path, "[ocr\ndpi = ").unwrap();

        let err = PipelineConfig::from_toml_file(&config_path).unwrap_err();
        assert!(matches!(err, CvError::Validation { .. }));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = PipelineConfig::from_file("settings.ini").unwrap_err();
        assert!(err.to_string().contains("Unsupported config format"));
    }

    #[test]
    fn test_accepts_extension_case_insensitive() {
        let app = AppConfig::default();
        assert!(app.accepts_extension("PDF"));
        assert!(app.accepts_extension(".docx"));
        assert!(!app.accepts_extension("exe"));
    }

    #[test]
    #[serial_test::serial]
    fn test_discover_cvinsight_toml() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cvinsight.toml"), "[ocr]\ndpi = 150\n").unwrap();

        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&dir).unwrap();

        let result = std::panic::catch_unwind(|| {
            let config = PipelineConfig::discover().unwrap();
            assert_eq!(config.unwrap().ocr.dpi, 150);
        });

        std::env::set_current_dir(&original_dir).unwrap();

        if let Err(e) = result {
            std::panic::resume_unwind(e);
        }
    }
}
