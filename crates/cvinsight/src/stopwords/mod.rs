//! Stopword lists for the short-text language heuristic.
//!
//! Only the most frequent function words are kept: enough to tell the
//! supported languages apart on a line or two of OCR output.

use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;

const ENGLISH: &[&str] = &[
    "a", "about", "all", "also", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "for", "from",
    "had", "has", "have", "he", "her", "his", "i", "in", "into", "is", "it", "its", "my", "not", "of", "on", "or",
    "our", "she", "that", "the", "their", "them", "there", "they", "this", "to", "was", "we", "were", "which",
    "while", "who", "will", "with", "you", "your",
];

const INDONESIAN: &[&str] = &[
    "ada", "adalah", "akan", "atau", "bagi", "bahwa", "dalam", "dan", "dari", "dengan", "di", "dia", "hingga",
    "ini", "itu", "jika", "juga", "kami", "karena", "ke", "kepada", "saya", "oleh", "pada", "para", "saat",
    "sebagai", "sejak", "selama", "serta", "sudah", "telah", "tentang", "tersebut", "untuk", "yang",
];

pub static STOPWORDS: Lazy<AHashMap<&'static str, AHashSet<&'static str>>> = Lazy::new(|| {
    let mut map = AHashMap::new();
    map.insert("eng", ENGLISH.iter().copied().collect());
    map.insert("ind", INDONESIAN.iter().copied().collect());
    map
});

/// Stopwords for an ISO 639-3 code (or its ISO 639-1 alias).
pub fn get_stopwords(lang: &str) -> Option<&'static AHashSet<&'static str>> {
    let normalized = lang.to_lowercase();
    let code = match normalized.split(['-', '_']).next().unwrap_or_default() {
        "en" => "eng",
        "id" => "ind",
        other => other,
    };
    STOPWORDS.get(code)
}
