//! Field validation and completeness scoring for extracted records.

use super::personal::{digit_count, plausible_name, plausible_phone};
use crate::types::{ConfidenceScores, ExtractedRecord, PersonalInfo, ValidationReport};
use once_cell::sync::Lazy;
use regex::Regex;

const MIN_ADDRESS_CHARS: usize = 10;
/// Confidence given to a populated section.
const FIELD_CONFIDENCE: f64 = 0.85;

const PERSONAL_WEIGHT: f64 = 0.4;
const EDUCATION_WEIGHT: f64 = 0.2;
const EXPERIENCE_WEIGHT: f64 = 0.2;
const SKILLS_WEIGHT: f64 = 0.2;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("Email validation regex pattern is valid and should compile")
});

pub fn valid_name(name: &str) -> bool {
    plausible_name(name.trim())
}

pub fn valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

pub fn valid_phone(phone: &str) -> bool {
    let phone = phone.trim();
    plausible_phone(phone)
        && digit_count(phone) > 0
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '\t' | '(' | ')' | '+' | '-' | '.'))
}

pub fn valid_address(address: &str) -> bool {
    address.trim().chars().count() >= MIN_ADDRESS_CHARS
}

fn skills_score(count: usize) -> f64 {
    match count {
        0 => 0.0,
        1..=2 => 0.5,
        3..=4 => 0.8,
        _ => 1.0,
    }
}

fn flag(valid: bool) -> f64 {
    if valid { 1.0 } else { 0.0 }
}

fn check(value: &Option<String>, rule: fn(&str) -> bool) -> bool {
    value.as_deref().is_some_and(rule)
}

/// Validate each personal field and score how complete the record is.
pub fn validate(record: &ExtractedRecord) -> ValidationReport {
    let PersonalInfo {
        name,
        email,
        phone,
        address,
    } = &record.personal_info;

    let name_valid = check(name, valid_name);
    let email_valid = check(email, valid_email);
    let phone_valid = check(phone, valid_phone);
    let address_valid = check(address, valid_address);

    let personal_info_score =
        (flag(name_valid) + flag(email_valid) + flag(phone_valid) + flag(address_valid)) / 4.0;
    let education_score = flag(
        record
            .education
            .iter()
            .any(|e| e.institution.as_deref().is_some_and(|i| i.chars().count() >= 3)),
    );
    let experience_score = flag(
        record
            .work_experience
            .iter()
            .any(|e| e.company.as_deref().is_some_and(|c| c.chars().count() >= 2)),
    );
    let skills_score = skills_score(record.skills.len());

    let overall_score = PERSONAL_WEIGHT * personal_info_score
        + EDUCATION_WEIGHT * education_score
        + EXPERIENCE_WEIGHT * experience_score
        + SKILLS_WEIGHT * skills_score;

    ValidationReport {
        name_valid,
        email_valid,
        phone_valid,
        address_valid,
        personal_info_score,
        education_score,
        experience_score,
        skills_score,
        overall_score,
    }
}

/// Coarse confidence from which fields were found.
pub fn confidence(record: &ExtractedRecord) -> ConfidenceScores {
    let info = &record.personal_info;
    let has_name = info.name.is_some();
    let has_email = info.email.is_some();
    let has_phone = info.phone.is_some();

    let overall = if has_name && has_email && !record.skills.is_empty() {
        0.9
    } else if has_name && has_email {
        0.7
    } else if has_email || has_phone {
        0.6
    } else {
        0.5
    };
    let populated = |present: bool| if present { FIELD_CONFIDENCE } else { 0.0 };

    ConfidenceScores {
        overall,
        personal_info: populated(has_name || has_email || has_phone || info.address.is_some()),
        skills: populated(!record.skills.is_empty()),
        education: populated(!record.education.is_empty()),
        work_experience: populated(!record.work_experience.is_empty()),
    }
}
