//! Structured field extraction from annotated resume text.
//!
//! Every field is extracted on its own. A field that cannot be found is
//! left empty and listed in `missing_fields`; it never fails the document.
//!
//! - [`sections`]: header detection and section segmentation
//! - [`strategy`]: named strategies with fixed confidences
//! - [`personal`]: name, email, phone and address
//! - [`skills`]: dictionary matching with fuzzy fallback
//! - [`history`]: education and work-experience entries
//! - [`misc`]: languages, certifications and summary
//! - [`validation`]: per-field checks and completeness scores

pub mod dates;
pub mod history;
pub mod misc;
pub mod personal;
pub mod sections;
pub mod skills;
pub mod strategy;
pub mod validation;

use crate::CvError;
use crate::core::config::SkillsConfig;
use crate::types::{AnnotationSet, ExtractedRecord};
use std::sync::Arc;

pub use sections::{Section, SectionKind, split_sections};
pub use skills::{SkillDefinition, SkillsDictionary};
pub use strategy::{FieldContext, FieldExtractor, FieldStrategy, RuleStrategy};

/// Turns text plus annotations into an [`ExtractedRecord`].
#[derive(Debug)]
pub struct EntityExtractor {
    dictionary: Arc<SkillsDictionary>,
    skills: SkillsConfig,
    name: FieldExtractor,
    email: FieldExtractor,
    phone: FieldExtractor,
    address: FieldExtractor,
}

impl EntityExtractor {
    pub fn new(dictionary: Arc<SkillsDictionary>, skills: SkillsConfig) -> Self {
        Self {
            dictionary,
            skills,
            name: personal::name_extractor(),
            email: personal::email_extractor(),
            phone: personal::phone_extractor(),
            address: personal::address_extractor(),
        }
    }

    /// Built-in dictionary merged with every configured dictionary file.
    ///
    /// # Errors
    ///
    /// Returns `CvError::Validation` when a dictionary file cannot be read
    /// or parsed.
    pub fn from_config(skills: &SkillsConfig) -> crate::Result<Self> {
        let dictionary = SkillsDictionary::from_config(skills)?;
        Ok(Self::new(Arc::new(dictionary), skills.clone()))
    }

    pub fn dictionary(&self) -> &SkillsDictionary {
        &self.dictionary
    }

    /// Replace one of the personal-info extractors, keyed by its field name.
    pub fn with_field_extractor(mut self, extractor: FieldExtractor) -> Self {
        match extractor.field() {
            "name" => self.name = extractor,
            "email" => self.email = extractor,
            "phone" => self.phone = extractor,
            "address" => self.address = extractor,
            other => tracing::warn!(field = other, "Ignoring extractor for unknown field"),
        }
        self
    }

    /// Extract every field from `text`.
    ///
    /// `annotations` must have been computed over the same `text`.
    pub fn extract(&self, source: &str, text: &str, annotations: &AnnotationSet) -> ExtractedRecord {
        let mut record = ExtractedRecord::empty(source);
        record.language = annotations.language.clone();

        let sections = split_sections(text);
        let ctx = FieldContext {
            text,
            annotations,
            sections: &sections,
            language: &annotations.language,
        };

        for extractor in [&self.name, &self.email, &self.phone, &self.address] {
            let Some((value, provenance)) = extractor.resolve(&ctx) else {
                continue;
            };
            let slot = match extractor.field() {
                "name" => &mut record.personal_info.name,
                "email" => &mut record.personal_info.email,
                "phone" => &mut record.personal_info.phone,
                _ => &mut record.personal_info.address,
            };
            *slot = Some(value);
            record.provenance.insert(extractor.field().to_string(), provenance);
        }

        record.skills = self.dictionary.match_skills_in(text, &annotations.language, &self.skills);
        record.education = history::education(&ctx);
        record.work_experience = history::experience(&ctx);
        record.languages = misc::languages(&ctx);
        record.certifications = misc::certifications(&ctx);
        record.summary = misc::summary(&ctx);

        record.missing_fields = missing_fields(&record);
        for field in &record.missing_fields {
            tracing::debug!(source, error = %CvError::field_missing(field.as_str()), "Field not found");
        }

        record.validation = validation::validate(&record);
        record.confidence = validation::confidence(&record);
        record
    }
}

fn missing_fields(record: &ExtractedRecord) -> Vec<String> {
    let info = &record.personal_info;
    [
        ("name", info.name.is_none()),
        ("email", info.email.is_none()),
        ("phone", info.phone.is_none()),
        ("address", info.address.is_none()),
        ("skills", record.skills.is_empty()),
        ("education", record.education.is_empty()),
        ("work_experience", record.work_experience.is_empty()),
        ("languages", record.languages.is_empty()),
        ("certifications", record.certifications.is_empty()),
        ("summary", record.summary.is_none()),
    ]
    .into_iter()
    .filter(|(_, missing)| *missing)
    .map(|(field, _)| field.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::NlpProcessor;
    use crate::core::config::NlpConfig;
    use crate::types::{LanguageLabel, NlpTier};

    fn extract(text: &str) -> ExtractedRecord {
        let processor = NlpProcessor::from_config(&NlpConfig::default()).unwrap();
        let annotations = processor.annotate(text, &LanguageLabel::code("eng")).unwrap();
        let extractor = EntityExtractor::from_config(&SkillsConfig::default()).unwrap();
        extractor.extract("cv.txt", text, &annotations)
    }

    #[test]
    fn test_contact_block_and_skills() {
        let record = extract(
            "John Doe\nEmail: john.doe@example.com\nPhone: +1-555-123-4567\n\nSkills\nRust, Python, Docker, Kubernetes\n",
        );
        assert_eq!(record.personal_info.name.as_deref(), Some("John Doe"));
        assert_eq!(record.personal_info.email.as_deref(), Some("john.doe@example.com"));
        assert_eq!(record.personal_info.phone.as_deref(), Some("+1-555-123-4567"));
        assert_eq!(record.skill_names(), vec!["Rust", "Python", "Docker", "Kubernetes"]);
        assert_eq!(record.provenance["email"].strategy, "labelled_email");
        assert_eq!(record.confidence.overall, 0.9);
        assert!(record.missing_fields.contains(&"education".to_string()));
        assert!(!record.missing_fields.contains(&"skills".to_string()));
    }

    #[test]
    fn test_empty_annotations_degrade_per_field() {
        let text = "Contact: jane@example.org";
        let annotations = AnnotationSet::empty(LanguageLabel::Unknown, NlpTier::Statistical, "builtin-eng");
        let extractor = EntityExtractor::from_config(&SkillsConfig::default()).unwrap();
        let record = extractor.extract("cv.txt", text, &annotations);
        assert_eq!(record.personal_info.email.as_deref(), Some("jane@example.org"));
        assert!(record.personal_info.name.is_none());
        assert!(record.missing_fields.contains(&"name".to_string()));
        assert_eq!(record.confidence.overall, 0.6);
    }

    #[test]
    fn test_custom_field_extractor() {
        let extractor = EntityExtractor::from_config(&SkillsConfig::default())
            .unwrap()
            .with_field_extractor(FieldExtractor::new("name").with(RuleStrategy::new("fixed", 0.5, |_| {
                Some("Fixed Name".to_string())
            })));
        let annotations = AnnotationSet::empty(LanguageLabel::Unknown, NlpTier::Statistical, "none");
        let record = extractor.extract("cv.txt", "nothing here", &annotations);
        assert_eq!(record.personal_info.name.as_deref(), Some("Fixed Name"));
        assert_eq!(record.provenance["name"].strategy, "fixed");
    }
}
