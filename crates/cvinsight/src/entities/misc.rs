//! Spoken languages, certifications and the profile summary.

use super::history::strip_bullet;
use super::sections::{SectionKind, classify_header, sections_of};
use super::strategy::FieldContext;
use crate::nlp::tokenizer::sentences;
use ahash::AHashMap;
use once_cell::sync::Lazy;

pub const MAX_SUMMARY_CHARS: usize = 600;
const MAX_CERTIFICATION_CHARS: usize = 200;
const SUMMARY_MIN_WORDS: usize = 10;
const SUMMARY_CANDIDATES: usize = 3;

const LANGUAGE_CUES: &[&str] = &[
    "language", "languages", "speak", "speaks", "spoken", "fluent", "fluency", "native", "bilingual", "bahasa",
    "fasih", "menguasai", "lancar",
];

const CERTIFICATION_CUES: &[&str] = &[
    "certified",
    "certificate",
    "certification",
    "certifications",
    "sertifikat",
    "sertifikasi",
    "bersertifikat",
];

/// `(variant, canonical name, country-like)`. Country-like variants only
/// count outside a languages section when preceded by "bahasa".
const LANGUAGE_NAMES: &[(&str, &str, bool)] = &[
    ("english", "English", false),
    ("inggris", "English", false),
    ("indonesian", "Indonesian", false),
    ("indonesia", "Indonesian", true),
    ("french", "French", false),
    ("perancis", "French", false),
    ("prancis", "French", false),
    ("german", "German", false),
    ("jerman", "German", false),
    ("spanish", "Spanish", false),
    ("spanyol", "Spanish", false),
    ("chinese", "Chinese", false),
    ("mandarin", "Chinese", false),
    ("japanese", "Japanese", false),
    ("jepang", "Japanese", true),
    ("korean", "Korean", false),
    ("korea", "Korean", true),
    ("arabic", "Arabic", false),
    ("arab", "Arabic", true),
    ("dutch", "Dutch", false),
    ("belanda", "Dutch", true),
    ("javanese", "Javanese", false),
    ("jawa", "Javanese", true),
    ("sundanese", "Sundanese", false),
    ("sunda", "Sundanese", true),
    ("malay", "Malay", false),
    ("melayu", "Malay", false),
    ("hindi", "Hindi", false),
    ("portuguese", "Portuguese", false),
    ("portugis", "Portuguese", false),
    ("russian", "Russian", false),
    ("rusia", "Russian", true),
    ("italian", "Italian", false),
    ("italia", "Italian", true),
    ("thai", "Thai", false),
    ("vietnamese", "Vietnamese", false),
];

static LANGUAGE_LOOKUP: Lazy<AHashMap<&'static str, (&'static str, bool)>> = Lazy::new(|| {
    LANGUAGE_NAMES
        .iter()
        .map(|(variant, canonical, country)| (*variant, (*canonical, *country)))
        .collect()
});

fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.iter().any(|existing| existing.eq_ignore_ascii_case(&item)) {
        items.push(item);
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn languages_in(text: &str, in_section: bool, found: &mut Vec<String>) {
    let words = words(text);
    for (i, word) in words.iter().enumerate() {
        let Some((canonical, country)) = LANGUAGE_LOOKUP.get(word.as_str()) else {
            continue;
        };
        let after_bahasa = i > 0 && words[i - 1] == "bahasa";
        if in_section || !country || after_bahasa {
            push_unique(found, (*canonical).to_string());
        }
    }
}

/// Canonical English names of spoken languages, in order of first mention.
pub fn languages(ctx: &FieldContext<'_>) -> Vec<String> {
    let mut found = Vec::new();
    for section in sections_of(ctx.sections, SectionKind::Languages) {
        languages_in(section.body, true, &mut found);
    }
    if !found.is_empty() {
        return found;
    }

    for span in sentences(ctx.text) {
        let sentence = &ctx.text[span.start..span.end];
        if words(sentence).iter().any(|w| LANGUAGE_CUES.contains(&w.as_str())) {
            languages_in(sentence, false, &mut found);
        }
    }
    found
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((at, _)) => text[..at].trim_end().to_string(),
        None => text.to_string(),
    }
}

pub fn certifications(ctx: &FieldContext<'_>) -> Vec<String> {
    let mut found = Vec::new();
    for section in sections_of(ctx.sections, SectionKind::Certifications) {
        for (_, line) in section.lines() {
            let item = strip_bullet(line);
            if !item.is_empty() {
                push_unique(&mut found, clip(item, MAX_CERTIFICATION_CHARS));
            }
        }
    }
    if !found.is_empty() {
        return found;
    }

    for line in ctx.text.lines().map(str::trim) {
        if line.is_empty() || classify_header(line).is_some() {
            continue;
        }
        if words(line).iter().any(|w| CERTIFICATION_CUES.contains(&w.as_str())) {
            let item = strip_bullet(line);
            if !item.is_empty() {
                push_unique(&mut found, clip(item, MAX_CERTIFICATION_CHARS));
            }
        }
    }
    found
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The summary section, or else the first of the opening sentences with
/// more than ten words.
pub fn summary(ctx: &FieldContext<'_>) -> Option<String> {
    let from_section = sections_of(ctx.sections, SectionKind::Summary)
        .map(|s| collapse_whitespace(s.body))
        .find(|s| !s.is_empty());
    if let Some(summary) = from_section {
        return Some(clip(&summary, MAX_SUMMARY_CHARS));
    }

    let spans = if ctx.annotations.sentences.is_empty() {
        sentences(ctx.text)
    } else {
        ctx.annotations.sentences.clone()
    };
    spans
        .iter()
        .take(SUMMARY_CANDIDATES)
        .filter_map(|s| ctx.text.get(s.start..s.end))
        .map(collapse_whitespace)
        .find(|s| s.split_whitespace().count() > SUMMARY_MIN_WORDS)
        .map(|s| clip(&s, MAX_SUMMARY_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::sections::split_sections;
    use crate::types::{AnnotationSet, LanguageLabel, NlpTier};

    fn run<T>(text: &str, f: impl Fn(&FieldContext<'_>) -> T) -> T {
        let language = LanguageLabel::code("eng");
        let annotations = AnnotationSet::empty(language.clone(), NlpTier::Statistical, "builtin-eng");
        let sections = split_sections(text);
        let ctx = FieldContext {
            text,
            annotations: &annotations,
            sections: &sections,
            language: &language,
        };
        f(&ctx)
    }

    #[test]
    fn test_languages_from_section() {
        let text = "Jane Doe\n\nLanguages\n- Bahasa Indonesia (native)\n- English (fluent)\n- Jepang (basic)\n";
        assert_eq!(run(text, languages), vec!["Indonesian", "English", "Japanese"]);
    }

    #[test]
    fn test_languages_from_sentences() {
        let text = "I live in Indonesia.\nI speak fluent English and conversational Mandarin.";
        assert_eq!(run(text, languages), vec!["English", "Chinese"]);

        let text = "Fasih berbahasa Inggris dan bahasa Jawa.";
        assert_eq!(run(text, languages), vec!["English", "Javanese"]);
    }

    #[test]
    fn test_certifications_section_and_fallback() {
        let text = "Certifications\n- AWS Certified Solutions Architect\n- CKA\n- CKA\n\nSkills\nRust";
        assert_eq!(run(text, certifications), vec!["AWS Certified Solutions Architect", "CKA"]);

        let text = "Projects\nBuilt a compiler\nSertifikat BNSP Junior Web Developer (2021)";
        assert_eq!(run(text, certifications), vec!["Sertifikat BNSP Junior Web Developer (2021)"]);
    }

    #[test]
    fn test_summary_from_section() {
        let text = "Summary\nBackend engineer   with seven years\nof experience.\n\nSkills\nRust";
        assert_eq!(
            run(text, summary).as_deref(),
            Some("Backend engineer with seven years of experience.")
        );
    }

    #[test]
    fn test_summary_fallback_and_truncation() {
        let text = "Jane Doe\nI am a data engineer who enjoys building reliable pipelines for analytics teams.";
        assert_eq!(
            run(text, summary).as_deref(),
            Some("I am a data engineer who enjoys building reliable pipelines for analytics teams.")
        );
        assert_eq!(run("Jane Doe\nShort line.", summary), None);

        let long = format!("Summary\n{}", "word ".repeat(400));
        let clipped = run(&long, summary).unwrap();
        assert!(clipped.chars().count() <= MAX_SUMMARY_CHARS);
    }
}
