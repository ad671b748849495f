//! Date and date-range normalization for English and Indonesian resumes.
//!
//! Output dates are `YYYY-MM-DD`, `YYYY-MM` or `YYYY` depending on how much
//! the source states. Ongoing ranges ("Present", "Sekarang") set
//! `current` and leave `end` empty; the clock is never read, so the same
//! text always normalizes the same way.

use crate::types::{DateRange, LanguageLabel};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const MONTHS: &str = r"january|januari|jan|february|februari|feb|march|maret|mar|april|apr|may|mei|june|juni|jun|july|juli|jul|august|agustus|aug|agu|agt|september|sept|sep|october|oktober|oct|okt|november|nov|december|desember|dec|des";

static DATE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?ix)
        \b(?:
            (?P<d1>\d{{1,2}})\s+(?P<m1>{MONTHS})\.?,?\s+(?P<y1>\d{{4}})
          | (?P<m2>{MONTHS})\.?\s+(?P<d2>\d{{1,2}})(?:,\s*|\s+)(?P<y2>\d{{4}})
          | (?P<m3>{MONTHS})\.?,?\s+(?P<y3>\d{{4}})
          | (?P<iy>\d{{4}})-(?P<im>\d{{1,2}})-(?P<id>\d{{1,2}})
          | (?P<a>\d{{1,2}})[/.-](?P<b>\d{{1,2}})[/.-](?P<ny>\d{{4}})
          | (?P<mm>\d{{1,2}})[/.-](?P<my>\d{{4}})
          | (?P<year>(?:19|20)\d{{2}})
          | (?P<present>present|current|now|ongoing|sekarang|saat\s+ini|kini)
        )\b"
    ))
    .expect("Date token regex pattern is valid and should compile")
});

static RANGE_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:-|–|—|~|to|until|till|hingga|sampai(?:\s+dengan)?|s/d|s\.d\.?)\s*$")
        .expect("Range separator regex pattern is valid and should compile")
});

/// A date found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateValue {
    Date(String),
    Present,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundDate {
    pub start: usize,
    pub end: usize,
    pub value: DateValue,
}

/// Month number for an English or Indonesian month name or abbreviation.
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.trim_end_matches('.').to_lowercase();
    let month = match lower.as_str() {
        "jan" | "january" | "januari" => 1,
        "feb" | "february" | "februari" => 2,
        "mar" | "march" | "maret" => 3,
        "apr" | "april" => 4,
        "may" | "mei" => 5,
        "jun" | "june" | "juni" => 6,
        "jul" | "july" | "juli" => 7,
        "aug" | "august" | "agu" | "agt" | "agustus" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" | "okt" | "oktober" => 10,
        "nov" | "november" => 11,
        "dec" | "december" | "des" | "desember" => 12,
        _ => return None,
    };
    Some(month)
}

/// Numeric dates read month-first in English and day-first otherwise.
fn month_first(language: &LanguageLabel) -> bool {
    language.as_str() == "eng"
}

fn number(caps: &Captures<'_>, name: &str) -> Option<u32> {
    caps.name(name).and_then(|m| m.as_str().parse().ok())
}

fn full_date(year: u32, month: u32, day: u32) -> Option<String> {
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

fn year_month(year: u32, month: u32) -> Option<String> {
    if (1..=12).contains(&month) && (1900..=2100).contains(&year) {
        Some(format!("{:04}-{:02}", year, month))
    } else {
        None
    }
}

fn value_of(caps: &Captures<'_>, language: &LanguageLabel) -> Option<DateValue> {
    if caps.name("present").is_some() {
        return Some(DateValue::Present);
    }

    let date = if let (Some(d), Some(m), Some(y)) = (number(caps, "d1"), caps.name("m1"), number(caps, "y1")) {
        full_date(y, month_number(m.as_str())?, d)
    } else if let (Some(m), Some(d), Some(y)) = (caps.name("m2"), number(caps, "d2"), number(caps, "y2")) {
        full_date(y, month_number(m.as_str())?, d)
    } else if let (Some(m), Some(y)) = (caps.name("m3"), number(caps, "y3")) {
        year_month(y, month_number(m.as_str())?)
    } else if let (Some(y), Some(m), Some(d)) = (number(caps, "iy"), number(caps, "im"), number(caps, "id")) {
        full_date(y, m, d)
    } else if let (Some(a), Some(b), Some(y)) = (number(caps, "a"), number(caps, "b"), number(caps, "ny")) {
        let (month, day) = if month_first(language) { (a, b) } else { (b, a) };
        full_date(y, month, day)
    } else if let (Some(m), Some(y)) = (number(caps, "mm"), number(caps, "my")) {
        year_month(y, m)
    } else {
        caps.name("year").map(|y| y.as_str().to_string())
    };

    date.map(DateValue::Date)
}

/// Every recognizable date in `text`, in order. Impossible dates are skipped.
pub fn find_dates(text: &str, language: &LanguageLabel) -> Vec<FoundDate> {
    DATE_TOKEN
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let value = value_of(&caps, language)?;
            Some(FoundDate {
                start: whole.start(),
                end: whole.end(),
                value,
            })
        })
        .collect()
}

/// Normalize a single date expression. Returns `None` for ongoing markers
/// and for anything that isn't a valid date.
pub fn normalize_date(raw: &str, language: &LanguageLabel) -> Option<String> {
    let trimmed = raw.trim();
    let caps = DATE_TOKEN.captures(trimmed)?;
    let whole = caps.get(0)?;
    if whole.start() != 0 || whole.end() != trimmed.len() {
        return None;
    }
    match value_of(&caps, language)? {
        DateValue::Date(date) => Some(date),
        DateValue::Present => None,
    }
}

pub fn is_present_marker(raw: &str) -> bool {
    DATE_TOKEN
        .captures(raw.trim())
        .is_some_and(|caps| caps.name("present").is_some())
}

/// First date range in `text` together with its byte span.
///
/// A range is two dates joined by a separator (`-`, en dash, `to`, `until`,
/// `hingga`, `sampai`, `s/d`), where the second may be an ongoing marker.
pub fn find_range(text: &str, language: &LanguageLabel) -> Option<(DateRange, usize, usize)> {
    let dates = find_dates(text, language);
    for pair in dates.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        let DateValue::Date(start) = &first.value else {
            continue;
        };
        if !RANGE_SEPARATOR.is_match(&text[first.end..second.start]) {
            continue;
        }
        let range = match &second.value {
            DateValue::Date(end) => DateRange {
                start: Some(start.clone()),
                end: Some(end.clone()),
                current: false,
            },
            DateValue::Present => DateRange {
                start: Some(start.clone()),
                end: None,
                current: true,
            },
        };
        return Some((range, first.start, second.end));
    }
    None
}

/// The first range in `text`, or a range starting at the first date.
pub fn extract_range(text: &str, language: &LanguageLabel) -> DateRange {
    if let Some((range, _, _)) = find_range(text, language) {
        return range;
    }
    find_dates(text, language)
        .into_iter()
        .find_map(|d| match d.value {
            DateValue::Date(date) => Some(DateRange {
                start: Some(date),
                end: None,
                current: false,
            }),
            DateValue::Present => None,
        })
        .unwrap_or_default()
}

/// Whether `text` states at least one concrete date.
pub fn has_date(text: &str, language: &LanguageLabel) -> bool {
    find_dates(text, language)
        .iter()
        .any(|d| matches!(d.value, DateValue::Date(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eng() -> LanguageLabel {
        LanguageLabel::code("eng")
    }

    fn ind() -> LanguageLabel {
        LanguageLabel::code("ind")
    }

    #[test]
    fn test_normalize_month_names() {
        assert_eq!(normalize_date("March 2020", &eng()).as_deref(), Some("2020-03"));
        assert_eq!(normalize_date("12 Agustus 2019", &ind()).as_deref(), Some("2019-08-12"));
        assert_eq!(normalize_date("Sept. 2018", &eng()).as_deref(), Some("2018-09"));
        assert_eq!(normalize_date("Desember 2021", &ind()).as_deref(), Some("2021-12"));
        assert_eq!(normalize_date("Jan 5, 2020", &eng()).as_deref(), Some("2020-01-05"));
    }

    #[test]
    fn test_numeric_order_depends_on_language() {
        assert_eq!(normalize_date("03/04/2020", &eng()).as_deref(), Some("2020-03-04"));
        assert_eq!(normalize_date("03/04/2020", &ind()).as_deref(), Some("2020-04-03"));
        assert_eq!(normalize_date("2020-04-03", &ind()).as_deref(), Some("2020-04-03"));
        assert_eq!(normalize_date("07/2019", &eng()).as_deref(), Some("2019-07"));
        assert_eq!(normalize_date("2015", &eng()).as_deref(), Some("2015"));
    }

    #[test]
    fn test_impossible_dates_rejected() {
        assert_eq!(normalize_date("31/02/2020", &ind()), None);
        assert_eq!(normalize_date("13/13/2020", &eng()), None);
        assert_eq!(normalize_date("30 February 2021", &eng()), None);
        assert_eq!(normalize_date("14/2020", &eng()), None);
    }

    #[test]
    fn test_present_ranges() {
        let (range, _, _) = find_range("Jan 2019 - Present", &eng()).unwrap();
        assert_eq!(range.start.as_deref(), Some("2019-01"));
        assert_eq!(range.end, None);
        assert!(range.current);

        let (range, _, _) = find_range("Maret 2020 hingga saat ini", &ind()).unwrap();
        assert_eq!(range.start.as_deref(), Some("2020-03"));
        assert!(range.current);
        assert!(is_present_marker("Sekarang"));
    }

    #[test]
    fn test_closed_ranges_and_separators() {
        for text in ["2016 – 2020", "2016 to 2020", "2016 sampai 2020", "2016 s/d 2020"] {
            let range = extract_range(text, &ind());
            assert_eq!(range.start.as_deref(), Some("2016"), "{}", text);
            assert_eq!(range.end.as_deref(), Some("2020"), "{}", text);
            assert!(!range.current);
        }
    }

    #[test]
    fn test_single_date_is_start_only() {
        let range = extract_range("Graduated 2014, cum laude", &eng());
        assert_eq!(range.start.as_deref(), Some("2014"));
        assert_eq!(range.end, None);
        assert!(find_range("Graduated 2014", &eng()).is_none());
        assert_eq!(extract_range("no dates here", &eng()), DateRange::default());
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let a = extract_range("June 2018 - now", &eng());
        let b = extract_range("June 2018 - now", &eng());
        assert_eq!(a, b);
        assert!(a.current);
    }
}
