//! NLP processing: tokens, sentences and typed entity spans.
//!
//! Two tiers exist. The statistical tier is the built-in rule and lexicon
//! recognizer; the transformer tier (feature `transformer`) runs an ONNX
//! token-classification model. The tier is fixed by configuration and the
//! model for a document is a pure function of (language, tier).

pub mod chunker;
pub mod lexicon;
pub mod statistical;
pub mod tokenizer;
#[cfg(feature = "transformer")]
pub mod transformer;

use crate::core::config::NlpConfig;
use crate::types::{AnnotationSet, EntitySpan, LanguageLabel, NlpTier};
use crate::{CvError, Result};
use ahash::AHashMap;
use std::sync::Arc;
use tracing::instrument;

pub use statistical::StatisticalModel;
#[cfg(feature = "transformer")]
pub use transformer::TransformerModel;

/// A named entity recognizer for one language.
///
/// Models are built once and shared by every document, so implementations
/// must be `Send + Sync` and keep no per-document state.
pub trait NlpModel: Send + Sync {
    fn name(&self) -> &str;

    fn tier(&self) -> NlpTier;

    /// Entity spans over `text`, with byte offsets into it.
    fn entities(&self, text: &str) -> Result<Vec<EntitySpan>>;
}

/// Selects a model per language and annotates text with it.
#[derive(Clone)]
pub struct NlpProcessor {
    tier: NlpTier,
    default_language: String,
    models: AHashMap<String, Arc<dyn NlpModel>>,
}

impl std::fmt::Debug for NlpProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut models: Vec<(&str, &str)> = self.models.iter().map(|(k, m)| (k.as_str(), m.name())).collect();
        models.sort_unstable();
        f.debug_struct("NlpProcessor")
            .field("tier", &self.tier)
            .field("default_language", &self.default_language)
            .field("models", &models)
            .finish()
    }
}

impl NlpProcessor {
    /// Build every configured model.
    ///
    /// # Errors
    ///
    /// Model load failures are returned, never deferred to the first
    /// document. With `use_transformer` set, every configured language must
    /// name a transformer directory and the `transformer` feature must be
    /// enabled.
    pub fn from_config(config: &NlpConfig) -> Result<Self> {
        let tier = if config.use_transformer {
            NlpTier::Transformer
        } else {
            NlpTier::Statistical
        };
        let mut processor = Self::new(tier, &config.default_language);

        for (language, spec) in &config.models {
            let model: Arc<dyn NlpModel> = match tier {
                NlpTier::Statistical => Arc::new(StatisticalModel::from_spec(language, spec)?),
                NlpTier::Transformer => load_transformer(language, spec.transformer.as_deref(), config)?,
            };
            processor.insert_model(language, model);
        }

        if !processor.models.contains_key(&processor.default_language) {
            if tier == NlpTier::Transformer {
                return Err(CvError::validation(format!(
                    "No transformer model configured for default language '{}'",
                    processor.default_language
                )));
            }
            let default = processor.default_language.clone();
            processor.insert_model(&default, Arc::new(StatisticalModel::builtin(&default)));
        }

        tracing::debug!(?processor, "NLP processor ready");
        Ok(processor)
    }

    /// An empty processor; models are added with [`NlpProcessor::insert_model`].
    pub fn new(tier: NlpTier, default_language: &str) -> Self {
        Self {
            tier,
            default_language: default_language.to_lowercase(),
            models: AHashMap::new(),
        }
    }

    pub fn insert_model(&mut self, language: &str, model: Arc<dyn NlpModel>) {
        self.models.insert(language.to_lowercase(), model);
    }

    pub fn tier(&self) -> NlpTier {
        self.tier
    }

    /// The model for `language`, falling back to the default language.
    pub fn model_for(&self, language: &LanguageLabel) -> Option<&Arc<dyn NlpModel>> {
        self.models
            .get(language.as_str())
            .or_else(|| self.models.get(&self.default_language))
    }

    /// Annotate `text`.
    ///
    /// Empty text, or text without a single alphanumeric character, yields
    /// an empty set without invoking a model.
    ///
    /// # Errors
    ///
    /// Returns `CvError::Nlp` when no model is available or inference fails.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub fn annotate(&self, text: &str, language: &LanguageLabel) -> Result<AnnotationSet> {
        let model = self
            .model_for(language)
            .ok_or_else(|| CvError::nlp(format!("No NLP model for language '{}'", language)))?;

        if text.trim().is_empty() || !text.chars().any(char::is_alphanumeric) {
            return Ok(AnnotationSet::empty(language.clone(), self.tier, model.name()));
        }

        let mut entities = model.entities(text)?;
        entities.retain(|e| {
            e.start < e.end && e.end <= text.len() && text.is_char_boundary(e.start) && text.is_char_boundary(e.end)
        });
        entities.sort_by_key(|e| (e.start, e.end));

        let tokens = tokenizer::tokenize(text);
        let sentences = tokenizer::sentences(text);
        let grammar = if self.models.contains_key(language.as_str()) {
            language.as_str()
        } else {
            self.default_language.as_str()
        };
        let noun_chunks = chunker::noun_chunks(text, &tokens, &sentences, grammar);

        let annotations = AnnotationSet {
            language: language.clone(),
            tier: self.tier,
            model: model.name().to_string(),
            tokens,
            sentences,
            entities,
            noun_chunks,
        };
        tracing::debug!(model = %annotations.model, stats = ?annotations.stats(), "Annotated text");
        Ok(annotations)
    }
}

#[cfg(feature = "transformer")]
fn load_transformer(language: &str, dir: Option<&str>, config: &NlpConfig) -> Result<Arc<dyn NlpModel>> {
    let dir = dir.ok_or_else(|| {
        CvError::validation(format!("No transformer model directory configured for '{}'", language))
    })?;
    Ok(Arc::new(TransformerModel::load(dir, config.max_sequence_length)?))
}

#[cfg(not(feature = "transformer"))]
fn load_transformer(_language: &str, _dir: Option<&str>, _config: &NlpConfig) -> Result<Arc<dyn NlpModel>> {
    Err(CvError::MissingDependency(
        "Transformer NLP tier requires the 'transformer' feature".to_string(),
    ))
}
