//! Education and work-history entries.
//!
//! A section body is cut into entries at blank lines, and at a dated line
//! once the entry being built already carries a date. Each entry takes its
//! organisation from the ORG entities inside it and its dates from the first
//! range it states. Entries with neither an organisation nor a date are
//! dropped.

use super::dates::{extract_range, find_range, has_date};
use super::sections::{Section, SectionKind, sections_of};
use super::strategy::FieldContext;
use crate::nlp::lexicon::is_org_keyword;
use crate::nlp::tokenizer::lines_with_offsets;
use crate::types::{DateRange, EducationEntry, EntityLabel, ExperienceEntry, LanguageLabel, Span};
use once_cell::sync::Lazy;
use regex::Regex;

const EDUCATION_KEYWORDS: &[&str] = &[
    "university",
    "universitas",
    "institute",
    "institut",
    "college",
    "school",
    "sekolah",
    "politeknik",
    "polytechnic",
    "akademi",
    "academy",
    "bachelor",
    "master",
    "sarjana",
    "magister",
    "diploma",
    "degree",
    "graduated",
    "lulus",
];

const EXPERIENCE_KEYWORDS: &[&str] = &[
    "worked",
    "working",
    "employed",
    "bekerja",
    "internship",
    "intern",
    "magang",
    "engineer",
    "developer",
    "manager",
    "analyst",
    "staff",
];

const BULLETS: &[char] = &['-', '•', '*', '▪', '●', '·', '◦', '‣', '–'];

static DEGREE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \b(?:
            (?i:bachelor|master|doctor(?:ate)?|associate|diploma|sarjana|magister|doktor)(?:'s)?(?:\s+(?i:degree))?
          | Ph\.?\s?D\.?
          | MBA | MSc | BSc | B\.?Eng | M\.?Eng | B\.?Sc | M\.?Sc | B\.A\. | M\.A\.
          | S\.?Kom | S\.?T | S\.?E
          | S[123] | D[1-4]
          | SMA | SMK
        )(?:\b|\s|$)",
    )
    .expect("Degree regex pattern is valid and should compile")
});

static FIELD_AFTER_DEGREE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[ \t]*(?:(?i:of|in|jurusan|program studi|prodi)\s+|[,:\-–][ \t]*)?(\p{Lu}[\p{L}.]*(?:[ \t]+(?:\p{Lu}[\p{L}.]*|and|dan|&))*)",
    )
    .expect("Field of study regex pattern is valid and should compile")
});

static AT_COMPANY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s(?:at|@|di)\s+(.+)$").expect("Company separator regex pattern is valid and should compile")
});

static TITLE_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(?:at|@|di|\||–|—|-)\s+|,\s*|\s*\|\s*|\t+")
        .expect("Title separator regex pattern is valid and should compile")
});

/// A block of consecutive lines belonging to one entry.
#[derive(Debug, Clone, Default)]
struct Block<'a> {
    lines: Vec<(usize, &'a str)>,
    dated: bool,
}

impl<'a> Block<'a> {
    fn span(&self) -> Option<Span> {
        let (first, _) = self.lines.first()?;
        let (last_offset, last) = self.lines.last()?;
        Some(Span {
            start: *first,
            end: last_offset + last.len(),
        })
    }

    fn raw(&self) -> String {
        self.lines.iter().map(|(_, l)| *l).collect::<Vec<_>>().join("\n")
    }
}

fn is_bullet(line: &str) -> bool {
    line.starts_with(BULLETS) || numbered_item(line).is_some()
}

fn numbered_item(line: &str) -> Option<&str> {
    let digits = line.find(|c: char| !c.is_ascii_digit())?;
    if digits == 0 || digits > 2 {
        return None;
    }
    line[digits..].strip_prefix(['.', ')']).map(str::trim_start)
}

pub(crate) fn strip_bullet(line: &str) -> &str {
    if let Some(rest) = numbered_item(line) {
        return rest;
    }
    line.trim_start_matches(BULLETS).trim()
}

/// Split a section body into entry blocks.
fn blocks<'a>(section: &Section<'a>, language: &LanguageLabel) -> Vec<Block<'a>> {
    let mut blocks = Vec::new();
    let mut current = Block::default();

    for (offset, line) in lines_with_offsets(section.body) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.lines.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }
        let at = section.offset + offset + (line.len() - line.trim_start().len());
        let dated = has_date(trimmed, language);

        if dated && current.dated {
            // Trailing non-bullet lines after the last bullet belong to the next entry.
            let carried = match current.lines.iter().rposition(|(_, l)| is_bullet(l)) {
                Some(last_bullet) => current.lines.split_off(last_bullet + 1),
                None => Vec::new(),
            };
            blocks.push(std::mem::take(&mut current));
            current.lines = carried;
        }
        current.dated |= dated;
        current.lines.push((at, trimmed));
    }
    if !current.lines.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// First ORG entity inside `span`, preferring ones that match `prefer`.
fn organisation_in(ctx: &FieldContext<'_>, span: Span, prefer: impl Fn(&str) -> bool) -> Option<String> {
    let orgs: Vec<&str> = ctx
        .annotations
        .entities_in(span)
        .filter(|e| e.label == EntityLabel::Org)
        .map(|e| e.text.trim())
        .collect();
    orgs.iter()
        .find(|o| prefer(o))
        .or_else(|| orgs.first())
        .map(|o| o.to_string())
}

fn mentions_education(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| EDUCATION_KEYWORDS.contains(&w))
}

fn mentions_experience(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| EXPERIENCE_KEYWORDS.contains(&w))
}

fn remove_dates(line: &str, language: &LanguageLabel) -> String {
    let mut line = line.to_string();
    if let Some((_, start, end)) = find_range(&line, language) {
        line.replace_range(start..end, "");
    }
    line.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '|' | '-' | '–' | '(' | ')'))
        .to_string()
}

fn degree_and_field(line: &str) -> Option<(String, Option<String>)> {
    let degree = DEGREE.find(line)?;
    let name = degree.as_str().trim().to_string();
    let field = FIELD_AFTER_DEGREE
        .captures(&line[degree.end()..])
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_end_matches(['.', ',']).to_string())
        .filter(|f| f.chars().count() > 2 && !f.split_whitespace().any(is_org_keyword));
    Some((name, field))
}

fn education_entry(ctx: &FieldContext<'_>, block: &Block<'_>) -> Option<EducationEntry> {
    let span = block.span()?;
    let raw = block.raw();
    let institution = organisation_in(ctx, span, mentions_education).or_else(|| {
        block
            .lines
            .iter()
            .map(|(_, l)| remove_dates(strip_bullet(l), ctx.language))
            .find(|l| mentions_education(l) && DEGREE.find(l).is_none())
    });
    let dates = extract_range(&raw, ctx.language);
    if institution.is_none() && dates == DateRange::default() {
        return None;
    }

    let (degree, field_of_study) = block
        .lines
        .iter()
        .find_map(|(_, l)| degree_and_field(l))
        .map_or((None, None), |(d, f)| (Some(d), f));

    Some(EducationEntry {
        institution,
        degree,
        field_of_study,
        dates,
        raw,
    })
}

fn title_from(line: &str, company: Option<&str>, language: &LanguageLabel) -> Option<String> {
    let cleaned = remove_dates(line, language);
    TITLE_SEPARATOR
        .split(&cleaned)
        .map(str::trim)
        .find(|piece| {
            !piece.is_empty()
                && piece.chars().any(char::is_alphabetic)
                && company.is_none_or(|c| !piece.eq_ignore_ascii_case(c) && !c.contains(piece))
        })
        .map(str::to_string)
}

fn experience_entry(ctx: &FieldContext<'_>, block: &Block<'_>) -> Option<ExperienceEntry> {
    let span = block.span()?;
    let raw = block.raw();
    let company = organisation_in(ctx, span, |_| true).or_else(|| {
        block.lines.iter().find_map(|(_, l)| {
            AT_COMPANY
                .captures(l)
                .and_then(|c| c.get(1))
                .map(|m| remove_dates(m.as_str(), ctx.language))
                .filter(|c| !c.is_empty())
        })
    });
    let dates = extract_range(&raw, ctx.language);
    if company.is_none() && dates == DateRange::default() {
        return None;
    }

    let headline: Vec<&str> = block
        .lines
        .iter()
        .map(|(_, l)| *l)
        .filter(|l| !is_bullet(l))
        .collect();
    let title = headline
        .iter()
        .filter(|l| remove_dates(l, ctx.language).chars().any(char::is_alphabetic))
        .find_map(|l| title_from(l, company.as_deref(), ctx.language));

    let mut responsibilities: Vec<String> = block
        .lines
        .iter()
        .filter(|(_, l)| is_bullet(l))
        .map(|(_, l)| strip_bullet(l).to_string())
        .filter(|l| !l.is_empty())
        .collect();
    if responsibilities.is_empty() {
        responsibilities = headline
            .iter()
            .filter(|l| l.split_whitespace().count() > 5 && !has_date(l, ctx.language))
            .map(|l| l.to_string())
            .collect();
    }

    Some(ExperienceEntry {
        company,
        title,
        dates,
        responsibilities,
        raw,
    })
}

/// Sentences mentioning a keyword and an organisation, for resumes without
/// section headers.
fn sentence_blocks<'a>(ctx: &FieldContext<'a>, keep: impl Fn(&str) -> bool) -> Vec<Block<'a>> {
    ctx.annotations
        .sentences
        .iter()
        .filter_map(|s| {
            let text = ctx.text.get(s.start..s.end)?;
            let has_org = ctx.annotations.entities_in(*s).any(|e| e.label == EntityLabel::Org);
            (has_org && keep(text)).then(|| Block {
                lines: vec![(s.start, text)],
                dated: has_date(text, ctx.language),
            })
        })
        .collect()
}

fn section_blocks<'a>(ctx: &FieldContext<'a>, kind: SectionKind) -> Vec<Block<'a>> {
    sections_of(ctx.sections, kind)
        .flat_map(|section| blocks(section, ctx.language))
        .collect()
}

pub fn education(ctx: &FieldContext<'_>) -> Vec<EducationEntry> {
    let mut blocks = section_blocks(ctx, SectionKind::Education);
    if blocks.is_empty() {
        blocks = sentence_blocks(ctx, mentions_education);
    }
    let mut entries: Vec<EducationEntry> = Vec::new();
    for entry in blocks.iter().filter_map(|b| education_entry(ctx, b)) {
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }
    entries
}

pub fn experience(ctx: &FieldContext<'_>) -> Vec<ExperienceEntry> {
    let mut blocks = section_blocks(ctx, SectionKind::Experience);
    if blocks.is_empty() {
        blocks = sentence_blocks(ctx, |s| mentions_experience(s) && !mentions_education(s));
    }
    let mut entries: Vec<ExperienceEntry> = Vec::new();
    for entry in blocks.iter().filter_map(|b| experience_entry(ctx, b)) {
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }
    entries
}
