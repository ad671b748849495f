//! Rule and lexicon entity recognizer.
//!
//! Deterministic and dependency-free at runtime: dates come from patterns,
//! places from a gazetteer, organisations from title-case runs with an
//! organisation keyword, and person names from short title-case lines in
//! the resume header or after a name label.

use super::NlpModel;
use super::lexicon::{self, GPE, LOC};
use super::tokenizer::{lines_with_offsets, tokenize};
use crate::core::config::ModelSpec;
use crate::entities::sections::classify_header;
use crate::types::{EntityLabel, EntitySpan, NlpTier, TokenTag};
use crate::{CvError, Result};
use ahash::AHashSet;
use once_cell::sync::Lazy;
use regex::Regex;

pub const BUILTIN_MODEL: &str = "builtin";

const DATE_SCORE: f32 = 0.9;
const ORG_SCORE: f32 = 0.75;
const PLACE_SCORE: f32 = 0.8;
const PERSON_SCORE: f32 = 0.7;
const LABELLED_PERSON_SCORE: f32 = 0.9;

const MONTHS: &str = r"jan(?:uary|uari)?|feb(?:ruary|ruari)?|mar(?:ch|et)?|apr(?:il)?|may|mei|jun(?:e|i)?|jul(?:y|i)?|aug(?:ust)?|agu(?:stus)?|agt|sep(?:t(?:ember)?)?|oct(?:ober)?|okt(?:ober)?|nov(?:ember)?|dec(?:ember)?|des(?:ember)?";

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:(?:\d{{1,2}}\s+)?(?:{MONTHS})\.?,?\s+(?:\d{{1,2}},?\s+)?\d{{4}}|\d{{4}}-\d{{1,2}}-\d{{1,2}}|\d{{1,2}}[/.-]\d{{1,2}}[/.-]\d{{4}}|\d{{1,2}}/\d{{4}}|(?:19|20)\d{{2}})\b"
    ))
    .expect("Date regex pattern is valid and should compile")
});

static GAZETTEER: Lazy<Regex> = Lazy::new(|| {
    let mut names: Vec<&str> = GPE.iter().chain(LOC.iter()).copied().collect();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    let alternation = names.iter().map(|n| regex::escape(n)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"\b(?:{alternation})\b")).expect("Gazetteer regex pattern is valid and should compile")
});

static LOC_SET: Lazy<AHashSet<&'static str>> = Lazy::new(|| LOC.iter().copied().collect());

static NAME_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:full\s+name|name|nama(?:\s+lengkap)?)\s*[:\-]\s*")
        .expect("Name label regex pattern is valid and should compile")
});

static NAME_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i:my name is|nama saya(?:\s+adalah)?)\s+(\p{Lu}[\p{L}'’.-]*(?:\s+\p{Lu}[\p{L}'’.-]*){0,3})")
        .expect("Name phrase regex pattern is valid and should compile")
});

/// The built-in statistical model.
#[derive(Debug, Clone)]
pub struct StatisticalModel {
    name: String,
}

impl StatisticalModel {
    pub fn builtin(language: &str) -> Self {
        Self {
            name: format!("{}-{}", BUILTIN_MODEL, language),
        }
    }

    /// Build the statistical model named by a model spec.
    ///
    /// # Errors
    ///
    /// Returns `CvError::Validation` for any model other than `builtin`.
    pub fn from_spec(language: &str, spec: &ModelSpec) -> Result<Self> {
        if spec.small != BUILTIN_MODEL {
            return Err(CvError::validation(format!(
                "Unknown statistical model '{}' for language '{}'",
                spec.small, language
            )));
        }
        Ok(Self::builtin(language))
    }
}

impl NlpModel for StatisticalModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> NlpTier {
        NlpTier::Statistical
    }

    fn entities(&self, text: &str) -> Result<Vec<EntitySpan>> {
        Ok(recognize(text))
    }
}

/// Run every recognizer and resolve overlaps: organisations first, then
/// dates, persons and places.
pub fn recognize(text: &str) -> Vec<EntitySpan> {
    let mut entities = organisations(text);
    merge(&mut entities, dates(text));
    merge(&mut entities, persons(text));
    merge(&mut entities, places(text));
    entities.sort_by_key(|e| (e.start, e.end));
    entities
}

fn overlaps(a: &EntitySpan, b: &EntitySpan) -> bool {
    a.start < b.end && b.start < a.end
}

fn merge(into: &mut Vec<EntitySpan>, candidates: Vec<EntitySpan>) {
    for candidate in candidates {
        if !into.iter().any(|e| overlaps(e, &candidate)) {
            into.push(candidate);
        }
    }
}

fn span(text: &str, label: EntityLabel, start: usize, end: usize, score: f32) -> EntitySpan {
    EntitySpan {
        label,
        start,
        end,
        text: text[start..end].to_string(),
        score,
    }
}

fn dates(text: &str) -> Vec<EntitySpan> {
    DATE_PATTERN
        .find_iter(text)
        .map(|m| span(text, EntityLabel::Date, m.start(), m.end(), DATE_SCORE))
        .collect()
}

fn places(text: &str) -> Vec<EntitySpan> {
    GAZETTEER
        .find_iter(text)
        .map(|m| {
            let label = if LOC_SET.contains(m.as_str()) {
                EntityLabel::Loc
            } else {
                EntityLabel::Gpe
            };
            span(text, label, m.start(), m.end(), PLACE_SCORE)
        })
        .collect()
}

fn is_capitalized(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

/// Title-case runs per line that contain an organisation keyword, name a
/// known employer, or directly follow `at` / `@`.
fn organisations(text: &str) -> Vec<EntitySpan> {
    let mut found = Vec::new();

    for (line_offset, line) in lines_with_offsets(text) {
        let tokens = tokenize(line);
        let mut i = 0;
        while i < tokens.len() {
            if tokens[i].tag != TokenTag::ProperNoun {
                i += 1;
                continue;
            }

            let run_start = i;
            let mut run_end = i;
            let mut j = i + 1;
            while j < tokens.len() {
                let token = &tokens[j];
                let adjacent = token.start == tokens[j - 1].end;
                if token.tag == TokenTag::ProperNoun {
                    run_end = j;
                    j += 1;
                } else if token.text == "." && adjacent {
                    j += 1;
                } else if lexicon::is_connector(&token.text)
                    && tokens.get(j + 1).is_some_and(|next| next.tag == TokenTag::ProperNoun)
                {
                    j += 1;
                } else {
                    break;
                }
            }

            let run = &tokens[run_start..=run_end];
            let start = run[0].start;
            let end = run[run.len() - 1].end;
            let run_text = &line[start..end];

            let after_at = run_start > 0 && matches!(tokens[run_start - 1].text.as_str(), "at" | "@");
            let keyword = run.iter().any(|t| lexicon::is_org_keyword(&t.text));
            let known = run.iter().any(|t| lexicon::is_known_org(&t.text));
            let is_place = GAZETTEER.find(run_text).is_some_and(|m| m.as_str() == run_text);
            let is_header = classify_header(run_text).is_some();

            if (keyword || known || (after_at && !is_place)) && !is_header {
                found.push(span(
                    text,
                    EntityLabel::Org,
                    line_offset + start,
                    line_offset + end,
                    ORG_SCORE,
                ));
            }

            i = j.max(run_end + 1);
        }
    }

    found
}

fn looks_like_name(candidate: &str) -> bool {
    let words: Vec<&str> = candidate.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) || candidate.chars().count() > 60 {
        return false;
    }

    let shaped = words.iter().all(|w| {
        is_capitalized(w) && w.chars().all(|c| c.is_alphabetic() || matches!(c, '-' | '\'' | '’' | '.'))
    });
    if !shaped {
        return false;
    }

    let lexical_clash = words
        .iter()
        .any(|w| lexicon::is_org_keyword(w) || lexicon::is_title_word(w) || lexicon::is_known_org(w));

    !lexical_clash && !GAZETTEER.is_match(candidate) && classify_header(candidate).is_none()
}

/// Person names from labelled lines anywhere, from "my name is" phrases,
/// and from bare title-case lines before the first section header.
fn persons(text: &str) -> Vec<EntitySpan> {
    let mut found = Vec::new();
    let mut in_header_block = true;

    for (line_offset, line) in lines_with_offsets(text) {
        if classify_header(line).is_some() {
            in_header_block = false;
            continue;
        }

        if let Some(label) = NAME_LABEL.find(line) {
            let rest = &line[label.end()..];
            let candidate = rest.trim_end();
            if looks_like_name(candidate) {
                let start = line_offset + label.end();
                found.push(span(
                    text,
                    EntityLabel::Person,
                    start,
                    start + candidate.len(),
                    LABELLED_PERSON_SCORE,
                ));
            }
            continue;
        }

        if let Some(caps) = NAME_PHRASE.captures(line)
            && let Some(name) = caps.get(1)
            && looks_like_name(name.as_str())
        {
            found.push(span(
                text,
                EntityLabel::Person,
                line_offset + name.start(),
                line_offset + name.end(),
                LABELLED_PERSON_SCORE,
            ));
            continue;
        }

        if in_header_block {
            let leading = line.len() - line.trim_start().len();
            let candidate = line.trim();
            if looks_like_name(candidate) {
                let start = line_offset + leading;
                found.push(span(
                    text,
                    EntityLabel::Person,
                    start,
                    start + candidate.len(),
                    PERSON_SCORE,
                ));
            }
        }
    }

    found
}
