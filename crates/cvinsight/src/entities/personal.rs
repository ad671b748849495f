//! Personal information strategies: name, email, phone and address.

use super::sections::classify_header;
use super::strategy::{FieldContext, FieldExtractor, RuleStrategy};
use crate::types::EntityLabel;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PHONE_DIGITS: usize = 7;
pub const MAX_PHONE_DIGITS: usize = 15;

/// Lines scanned by the `header_line` name strategy.
const HEADER_LINES: usize = 5;

pub static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("Email regex pattern is valid and should compile")
});

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,3}[-. \t]?)?(?:\(\d{2,4}\)|\d{2,4})[-. \t]?\d{3,4}[-. \t]?\d{3,5}")
        .expect("Phone regex pattern is valid and should compile")
});

static POSTAL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{5}\b").expect("Postal code regex pattern is valid and should compile"));

static LABELLED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:full[ \t]+name|name|nama(?:[ \t]+lengkap)?)[ \t]*[:\-][ \t]*(.+?)[ \t]*$")
        .expect("Labelled name regex pattern is valid and should compile")
});

static LABELLED_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:e-?mail|surel|surat elektronik)[ \t]*[:\-]?[ \t]*([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})")
        .expect("Labelled email regex pattern is valid and should compile")
});

static LABELLED_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:phone|mobile|cell|tel(?:ephone)?|hp|no\.?[ \t]*(?:hp|telp|telepon)|telp|telepon|ponsel|whatsapp|wa)[ \t]*[:\-.]?[ \t]*(\+?[\d \t().-]{7,})",
    )
    .expect("Labelled phone regex pattern is valid and should compile")
});

static LABELLED_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:address|alamat|domisili|location|lokasi)[ \t]*[:\-][ \t]*(.+?)[ \t]*$")
        .expect("Labelled address regex pattern is valid and should compile")
});

pub fn digit_count(value: &str) -> usize {
    value.chars().filter(char::is_ascii_digit).count()
}

pub fn plausible_phone(value: &str) -> bool {
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digit_count(value))
}

/// Runs of four-digit years such as "2015 2016 2017".
fn only_years(value: &str) -> bool {
    value
        .split(|c: char| !c.is_ascii_digit())
        .filter(|g| !g.is_empty())
        .all(|g| g.len() == 4 && (g.starts_with("19") || g.starts_with("20")))
}

/// Letters, spaces, hyphens, apostrophes and periods; at least one letter.
pub fn plausible_name(value: &str) -> bool {
    let len = value.chars().count();
    (2..=100).contains(&len)
        && value.chars().any(char::is_alphabetic)
        && value
            .chars()
            .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '’' | '.'))
}

fn labelled_name(ctx: &FieldContext<'_>) -> Option<String> {
    LABELLED_NAME
        .captures_iter(ctx.text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|v| plausible_name(v))
        .map(str::to_string)
}

fn ner_person(ctx: &FieldContext<'_>) -> Option<String> {
    ctx.annotations
        .entities_with(EntityLabel::Person)
        .map(|e| e.text.trim())
        .find(|v| plausible_name(v))
        .map(str::to_string)
}

fn header_line(ctx: &FieldContext<'_>) -> Option<String> {
    ctx.text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(HEADER_LINES)
        .find(|line| {
            let words = line.split_whitespace().count();
            (2..=4).contains(&words)
                && plausible_name(line)
                && line.split_whitespace().all(|w| w.chars().next().is_some_and(char::is_uppercase))
                && classify_header(line).is_none()
        })
        .map(str::to_string)
}

fn labelled_email(ctx: &FieldContext<'_>) -> Option<String> {
    LABELLED_EMAIL
        .captures(ctx.text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn email_pattern(ctx: &FieldContext<'_>) -> Option<String> {
    EMAIL_PATTERN.find(ctx.text).map(|m| m.as_str().to_string())
}

fn labelled_phone(ctx: &FieldContext<'_>) -> Option<String> {
    LABELLED_PHONE
        .captures_iter(ctx.text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_end_matches(['-', '.', '(']).trim())
        .find(|v| plausible_phone(v))
        .map(str::to_string)
}

fn phone_pattern(ctx: &FieldContext<'_>) -> Option<String> {
    let text = ctx.text;
    PHONE_PATTERN
        .find_iter(text)
        .filter(|m| {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            !before.is_some_and(|c| c.is_ascii_digit() || c == '/')
                && !after.is_some_and(|c| c.is_ascii_digit() || c == '/')
        })
        .map(|m| m.as_str().trim())
        .find(|v| plausible_phone(v) && !only_years(v))
        .map(str::to_string)
}

fn labelled_address(ctx: &FieldContext<'_>) -> Option<String> {
    LABELLED_ADDRESS
        .captures(ctx.text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// First two location entities, plus the first five-digit postal code.
fn ner_location(ctx: &FieldContext<'_>) -> Option<String> {
    let mut parts: Vec<String> = ctx
        .annotations
        .entities
        .iter()
        .filter(|e| matches!(e.label, EntityLabel::Gpe | EntityLabel::Loc))
        .map(|e| e.text.trim().to_string())
        .fold(Vec::new(), |mut acc, place| {
            if !acc.contains(&place) {
                acc.push(place);
            }
            acc
        });
    if parts.is_empty() {
        return None;
    }
    parts.truncate(2);
    if let Some(code) = POSTAL_CODE.find(ctx.text) {
        parts.push(code.as_str().to_string());
    }
    Some(parts.join(", "))
}

pub fn name_extractor() -> FieldExtractor {
    FieldExtractor::new("name")
        .with(RuleStrategy::new("labelled_name", 0.95, labelled_name))
        .with(RuleStrategy::new("ner_person", 0.85, ner_person))
        .with(RuleStrategy::new("header_line", 0.6, header_line))
}

pub fn email_extractor() -> FieldExtractor {
    FieldExtractor::new("email")
        .with(RuleStrategy::new("labelled_email", 1.0, labelled_email))
        .with(RuleStrategy::new("email_pattern", 0.95, email_pattern))
}

pub fn phone_extractor() -> FieldExtractor {
    FieldExtractor::new("phone")
        .with(RuleStrategy::new("labelled_phone", 0.95, labelled_phone))
        .with(RuleStrategy::new("phone_pattern", 0.8, phone_pattern))
}

pub fn address_extractor() -> FieldExtractor {
    FieldExtractor::new("address")
        .with(RuleStrategy::new("labelled_address", 0.9, labelled_address))
        .with(RuleStrategy::new("ner_location", 0.6, ner_location))
}
