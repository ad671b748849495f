//! Resume section segmentation.
//!
//! A header is a short line (at most six words, no digits) naming a known
//! section in English or Indonesian, optionally followed by a colon. A colon
//! header may carry its body inline (`Skills: Rust, Go`).

use crate::nlp::tokenizer::lines_with_offsets;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

const MAX_HEADER_WORDS: usize = 6;
const MAX_HEADER_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Summary,
    Experience,
    Education,
    Skills,
    Languages,
    Certifications,
    Contact,
    Projects,
    Other,
}

/// A contiguous region of the text. The region before the first header is
/// reported as `Contact` with no header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub kind: SectionKind,
    pub header: Option<&'a str>,
    /// Byte offset of `body` in the full text.
    pub offset: usize,
    pub body: &'a str,
}

impl<'a> Section<'a> {
    /// Non-empty trimmed lines of the body, with absolute byte offsets.
    pub fn lines(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        let base = self.offset;
        lines_with_offsets(self.body).filter_map(move |(offset, line)| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                None
            } else {
                let leading = line.len() - line.trim_start().len();
                Some((base + offset + leading, trimmed))
            }
        })
    }
}

static EXACT_HEADERS: Lazy<AHashMap<&'static str, SectionKind>> = Lazy::new(|| {
    use SectionKind::*;
    let table: &[(SectionKind, &[&str])] = &[
        (
            Summary,
            &[
                "summary",
                "professional summary",
                "career summary",
                "profile",
                "professional profile",
                "personal profile",
                "about me",
                "objective",
                "career objective",
                "ringkasan",
                "ringkasan profesional",
                "profil",
                "profil singkat",
                "tentang saya",
                "tujuan karir",
            ],
        ),
        (
            Experience,
            &[
                "experience",
                "work experience",
                "professional experience",
                "working experience",
                "employment",
                "employment history",
                "work history",
                "career history",
                "pengalaman",
                "pengalaman kerja",
                "pengalaman profesional",
                "riwayat pekerjaan",
                "riwayat kerja",
            ],
        ),
        (
            Education,
            &[
                "education",
                "academic background",
                "educational background",
                "education background",
                "pendidikan",
                "pendidikan formal",
                "riwayat pendidikan",
                "latar belakang pendidikan",
            ],
        ),
        (
            Skills,
            &[
                "skills",
                "skill",
                "technical skills",
                "core skills",
                "key skills",
                "soft skills",
                "hard skills",
                "skills and abilities",
                "competencies",
                "core competencies",
                "keahlian",
                "keterampilan",
                "kompetensi",
                "kemampuan",
            ],
        ),
        (
            Languages,
            &["languages", "language", "language skills", "bahasa", "kemampuan bahasa", "penguasaan bahasa"],
        ),
        (
            Certifications,
            &[
                "certifications",
                "certification",
                "certificates",
                "licenses and certifications",
                "licenses certifications",
                "courses",
                "training",
                "sertifikasi",
                "sertifikat",
                "pelatihan",
                "pelatihan dan sertifikasi",
            ],
        ),
        (
            Contact,
            &[
                "contact",
                "contact information",
                "contact details",
                "personal information",
                "personal details",
                "kontak",
                "informasi kontak",
                "data pribadi",
                "data diri",
                "informasi pribadi",
            ],
        ),
        (Projects, &["projects", "personal projects", "key projects", "proyek", "projek", "portofolio", "portfolio"]),
        (
            Other,
            &[
                "hobbies",
                "interests",
                "references",
                "awards",
                "achievements",
                "honors and awards",
                "organizations",
                "volunteer",
                "volunteering",
                "publications",
                "additional information",
                "hobi",
                "minat",
                "referensi",
                "penghargaan",
                "prestasi",
                "organisasi",
                "pengalaman organisasi",
            ],
        ),
    ];

    table
        .iter()
        .flat_map(|(kind, phrases)| phrases.iter().map(move |p| (*p, *kind)))
        .collect()
});

/// Single keywords accepted in emphasized headers (all caps or colon).
const KEYWORDS: &[(&str, SectionKind)] = &[
    ("summary", SectionKind::Summary),
    ("profile", SectionKind::Summary),
    ("objective", SectionKind::Summary),
    ("experience", SectionKind::Experience),
    ("employment", SectionKind::Experience),
    ("pengalaman", SectionKind::Experience),
    ("education", SectionKind::Education),
    ("pendidikan", SectionKind::Education),
    ("skills", SectionKind::Skills),
    ("keahlian", SectionKind::Skills),
    ("keterampilan", SectionKind::Skills),
    ("languages", SectionKind::Languages),
    ("bahasa", SectionKind::Languages),
    ("certifications", SectionKind::Certifications),
    ("certificates", SectionKind::Certifications),
    ("sertifikasi", SectionKind::Certifications),
    ("contact", SectionKind::Contact),
    ("kontak", SectionKind::Contact),
    ("projects", SectionKind::Projects),
    ("proyek", SectionKind::Projects),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header<'a> {
    kind: SectionKind,
    label: &'a str,
    /// Byte offset in the line where the section body starts, if inline.
    inline_body: Option<usize>,
}

/// Classify a single line as a section header.
pub fn classify_header(line: &str) -> Option<SectionKind> {
    parse_header(line).map(|h| h.kind)
}

fn parse_header(line: &str) -> Option<Header<'_>> {
    let start = line.len() - line.trim_start_matches(|c: char| c.is_whitespace() || "#*•■▪>".contains(c)).len();
    let trimmed = line[start..].trim_end();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_HEADER_CHARS {
        return None;
    }

    if let Some((head, rest)) = trimmed.split_once(':') {
        let head = head.trim();
        if rest.trim().is_empty() {
            return classify(head, true).map(|kind| Header {
                kind,
                label: head,
                inline_body: None,
            });
        }
        let kind = exact(head)?;
        let body_at = start + trimmed.len() - rest.len();
        return Some(Header {
            kind,
            label: head,
            inline_body: Some(body_at),
        });
    }

    classify(trimmed, false).map(|kind| Header {
        kind,
        label: trimmed,
        inline_body: None,
    })
}

fn normalize(label: &str) -> Option<String> {
    if label.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let words: Vec<String> = label
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty() && *w != "&")
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() || words.len() > MAX_HEADER_WORDS {
        return None;
    }
    Some(words.join(" "))
}

fn exact(label: &str) -> Option<SectionKind> {
    let normalized = normalize(label)?;
    EXACT_HEADERS
        .get(normalized.as_str())
        .or_else(|| EXACT_HEADERS.get(normalized.replace(" and ", " ").replace(" dan ", " ").as_str()))
        .copied()
}

fn classify(label: &str, had_colon: bool) -> Option<SectionKind> {
    if let Some(kind) = exact(label) {
        return Some(kind);
    }

    let emphasized = had_colon || (label.chars().any(char::is_alphabetic) && !label.chars().any(char::is_lowercase));
    if !emphasized {
        return None;
    }

    let normalized = normalize(label)?;
    normalized
        .split(' ')
        .find_map(|word| KEYWORDS.iter().find(|(kw, _)| *kw == word).map(|(_, kind)| *kind))
}

/// Split text into sections at header lines.
pub fn split_sections(text: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut kind = SectionKind::Contact;
    let mut header: Option<&str> = None;
    let mut body_start = 0;

    for (offset, line) in lines_with_offsets(text) {
        let Some(parsed) = parse_header(line) else {
            continue;
        };

        push_section(text, kind, header, body_start, offset, &mut sections);
        kind = parsed.kind;
        header = Some(parsed.label);
        body_start = match parsed.inline_body {
            Some(at) => offset + at,
            None => offset + line.len(),
        };
    }
    push_section(text, kind, header, body_start, text.len(), &mut sections);

    sections
}

fn push_section<'a>(
    text: &'a str,
    kind: SectionKind,
    header: Option<&'a str>,
    start: usize,
    end: usize,
    sections: &mut Vec<Section<'a>>,
) {
    let body = &text[start..end.max(start)];
    if header.is_none() && body.trim().is_empty() {
        return;
    }
    sections.push(Section {
        kind,
        header,
        offset: start,
        body,
    });
}

/// Bodies of every section of `kind`, in document order.
pub fn sections_of<'a>(sections: &'a [Section<'a>], kind: SectionKind) -> impl Iterator<Item = &'a Section<'a>> {
    sections.iter().filter(move |s| s.kind == kind)
}
