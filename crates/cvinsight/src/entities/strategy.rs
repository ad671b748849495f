//! Named, confidence-scored field strategies.

use super::sections::Section;
use crate::types::{AnnotationSet, LanguageLabel, Provenance};

/// Everything a strategy may look at for one document.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub text: &'a str,
    pub annotations: &'a AnnotationSet,
    pub sections: &'a [Section<'a>],
    pub language: &'a LanguageLabel,
}

/// One way of extracting a single field.
pub trait FieldStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Fixed confidence assigned to a value this strategy produces.
    fn confidence(&self) -> f64;

    fn extract(&self, ctx: &FieldContext<'_>) -> Option<String>;
}

/// A strategy backed by a plain function.
#[derive(Clone, Copy)]
pub struct RuleStrategy {
    name: &'static str,
    confidence: f64,
    rule: fn(&FieldContext<'_>) -> Option<String>,
}

impl RuleStrategy {
    pub const fn new(name: &'static str, confidence: f64, rule: fn(&FieldContext<'_>) -> Option<String>) -> Self {
        Self { name, confidence, rule }
    }
}

impl std::fmt::Debug for RuleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleStrategy")
            .field("name", &self.name)
            .field("confidence", &self.confidence)
            .finish()
    }
}

impl FieldStrategy for RuleStrategy {
    fn name(&self) -> &str {
        self.name
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn extract(&self, ctx: &FieldContext<'_>) -> Option<String> {
        (self.rule)(ctx)
    }
}

/// The ordered strategies for one field.
pub struct FieldExtractor {
    field: &'static str,
    strategies: Vec<Box<dyn FieldStrategy>>,
}

impl std::fmt::Debug for FieldExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("FieldExtractor")
            .field("field", &self.field)
            .field("strategies", &names)
            .finish()
    }
}

impl FieldExtractor {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    pub fn with(mut self, strategy: impl FieldStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Run every strategy and keep the most confident value. Ties go to the
    /// strategy registered first.
    pub fn resolve(&self, ctx: &FieldContext<'_>) -> Option<(String, Provenance)> {
        let mut best: Option<(String, &dyn FieldStrategy)> = None;

        for strategy in &self.strategies {
            let Some(value) = strategy.extract(ctx) else {
                continue;
            };
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            tracing::trace!(field = self.field, strategy = strategy.name(), %value, "Strategy produced a value");
            if best
                .as_ref()
                .is_none_or(|(_, current)| strategy.confidence() > current.confidence())
            {
                best = Some((value, strategy.as_ref()));
            }
        }

        best.map(|(value, strategy)| {
            (
                value,
                Provenance {
                    strategy: strategy.name().to_string(),
                    confidence: strategy.confidence(),
                },
            )
        })
    }
}
