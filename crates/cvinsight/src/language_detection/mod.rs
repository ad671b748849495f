//! Language detection using whatlang, with a stopword heuristic for short text.
//!
//! Detection never fails: the worst outcome is the `unknown` label, which
//! routes the document to the default NLP pipeline.

use crate::core::config::LanguageDetectionConfig;
use crate::stopwords::get_stopwords;
use crate::types::{DetectionMethod, LanguageDetection, LanguageLabel};
use crate::CvError;
use whatlang::{Lang, detect};

/// Ceiling for confidences produced by the short-text heuristic.
const SHORT_TEXT_MAX_CONFIDENCE: f64 = 0.5;

/// Classifies text into one of the supported languages.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    supported: Vec<String>,
    config: LanguageDetectionConfig,
}

impl LanguageDetector {
    pub fn new(supported_languages: &[String], config: &LanguageDetectionConfig) -> Self {
        Self {
            supported: supported_languages.iter().map(|l| l.to_lowercase()).collect(),
            config: config.clone(),
        }
    }

    pub fn supported(&self) -> &[String] {
        &self.supported
    }

    /// Detect the language of `text`.
    ///
    /// - empty text: `unknown`
    /// - shorter than `short_text_threshold` characters: stopword overlap
    /// - otherwise whatlang; unsupported results become `unknown`, and
    ///   unreliable ones are retried with the stopword heuristic and flagged
    ///   ambiguous
    pub fn detect(&self, text: &str) -> LanguageDetection {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return LanguageDetection::unknown();
        }

        if trimmed.chars().count() < self.config.short_text_threshold {
            return self.detect_short(trimmed).unwrap_or_else(LanguageDetection::unknown);
        }

        let Some(info) = detect(trimmed) else {
            tracing::debug!("whatlang returned no candidate");
            return self.ambiguous(trimmed, "no language candidate");
        };

        let code = lang_to_iso639_3(info.lang());
        let confidence = info.confidence();

        if !info.is_reliable() || confidence < self.config.min_confidence {
            let reason = CvError::ambiguous_language(format!("{} with confidence {:.2}", code, confidence));
            tracing::debug!(%reason, "Falling back to stopword heuristic");
            return self.ambiguous(trimmed, &reason.to_string());
        }

        if !self.is_supported(&code) {
            tracing::debug!(code, confidence, "Detected language is not supported, using default pipeline");
            return LanguageDetection {
                label: LanguageLabel::Unknown,
                confidence,
                method: DetectionMethod::Statistical,
                ambiguous: false,
            };
        }

        LanguageDetection {
            label: LanguageLabel::code(code),
            confidence,
            method: DetectionMethod::Statistical,
            ambiguous: false,
        }
    }

    /// Use a caller-provided language instead of detecting one.
    pub fn override_with(&self, code: &str) -> LanguageDetection {
        let label = LanguageLabel::code(code);
        if label.is_unknown() {
            return LanguageDetection::unknown();
        }
        LanguageDetection {
            label,
            confidence: 1.0,
            method: DetectionMethod::Override,
            ambiguous: false,
        }
    }

    fn is_supported(&self, code: &str) -> bool {
        self.supported.iter().any(|l| l == code)
    }

    fn ambiguous(&self, text: &str, reason: &str) -> LanguageDetection {
        let mut detection = self.detect_short(text).unwrap_or_else(LanguageDetection::unknown);
        detection.ambiguous = true;
        tracing::debug!(reason, label = %detection.label, "Ambiguous language detection");
        detection
    }

    /// Stopword overlap against every supported language.
    ///
    /// Ties go to the language listed first in `supported_languages`.
    fn detect_short(&self, text: &str) -> Option<LanguageDetection> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();
        if words.is_empty() {
            return None;
        }

        let mut best: Option<(&str, usize)> = None;
        for lang in &self.supported {
            let Some(stopwords) = get_stopwords(lang) else {
                continue;
            };
            let hits = words.iter().filter(|w| stopwords.contains(w.as_str())).count();
            if hits > 0 && best.is_none_or(|(_, best_hits)| hits > best_hits) {
                best = Some((lang.as_str(), hits));
            }
        }

        best.map(|(lang, hits)| LanguageDetection {
            label: LanguageLabel::code(lang),
            confidence: (hits as f64 / words.len() as f64).min(SHORT_TEXT_MAX_CONFIDENCE),
            method: DetectionMethod::ShortText,
            ambiguous: false,
        })
    }
}

/// Convert whatlang Lang enum to an ISO 639-3 language code.
fn lang_to_iso639_3(lang: Lang) -> String {
    lang.code().to_string()
}
