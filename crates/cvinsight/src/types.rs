use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Input
// ============================================================================

/// Image container formats accepted by the OCR processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Tiff,
    Bmp,
    Webp,
    Gif,
}

impl ImageFormat {
    pub fn as_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Tiff => image::ImageFormat::Tiff,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
            ImageFormat::Webp => image::ImageFormat::WebP,
            ImageFormat::Gif => image::ImageFormat::Gif,
        }
    }
}

/// Detected kind of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "format", rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    Docx,
    Image(ImageFormat),
    PlainText,
    Zip,
}

impl FileKind {
    /// Whether the kind may carry embedded text that can be read without OCR.
    pub fn is_text_native(self) -> bool {
        matches!(self, FileKind::Pdf | FileKind::Docx | FileKind::PlainText)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Pdf => write!(f, "pdf"),
            FileKind::Docx => write!(f, "docx"),
            FileKind::Image(format) => write!(f, "image/{:?}", format),
            FileKind::PlainText => write!(f, "txt"),
            FileKind::Zip => write!(f, "zip"),
        }
    }
}

/// A unit of input: source name, raw bytes and sniffed kind.
///
/// Bytes are reference counted so archive members and batch jobs can share
/// them without copying.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: String,
    pub bytes: Arc<[u8]>,
    pub kind: FileKind,
}

impl Document {
    pub fn new(source: impl Into<String>, bytes: impl Into<Arc<[u8]>>, kind: FileKind) -> Self {
        Self {
            source: source.into(),
            bytes: bytes.into(),
            kind,
        }
    }

    /// File stem of the source name, used for artifact names.
    pub fn stem(&self) -> &str {
        let name = self.source.rsplit(['/', '\\']).next().unwrap_or(&self.source);
        match name.rfind('.') {
            Some(0) | None => name,
            Some(pos) => &name[..pos],
        }
    }
}

// ============================================================================
// OCR / text extraction
// ============================================================================

/// Where the text of a page or document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    Direct,
    Ocr,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub page_number: usize,
    pub text: String,
    /// Engine confidence in 0..=100. `None` for blank pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub source: TextSource,
}

/// Text recovered from a document, with per-page detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub text: String,
    pub pages: Vec<PageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_confidence: Option<f64>,
    pub source: TextSource,
}

impl OcrResult {
    /// Builds a result from pages, joining their text with a blank line.
    pub fn from_pages(pages: Vec<PageResult>) -> Self {
        let text = pages
            .iter()
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        let confidences: Vec<f64> = pages.iter().filter_map(|p| p.confidence).filter(|c| *c >= 0.0).collect();
        let mean_confidence = if confidences.is_empty() {
            None
        } else {
            Some(confidences.iter().sum::<f64>() / confidences.len() as f64)
        };

        let has_direct = pages.iter().any(|p| p.source == TextSource::Direct);
        let has_ocr = pages.iter().any(|p| p.source == TextSource::Ocr);
        let source = match (has_direct, has_ocr) {
            (true, true) => TextSource::Mixed,
            (false, true) => TextSource::Ocr,
            _ => TextSource::Direct,
        };

        Self {
            text,
            pages,
            mean_confidence,
            source,
        }
    }

    pub fn direct(text: String) -> Self {
        Self::from_pages(vec![PageResult {
            page_number: 1,
            text,
            confidence: Some(100.0),
            source: TextSource::Direct,
        }])
    }
}

// ============================================================================
// Language
// ============================================================================

/// A supported ISO 639-3 language code, or `unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LanguageLabel {
    Code(String),
    Unknown,
}

impl LanguageLabel {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn code(code: impl Into<String>) -> Self {
        LanguageLabel::from(code.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            LanguageLabel::Code(code) => code,
            LanguageLabel::Unknown => Self::UNKNOWN,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, LanguageLabel::Unknown)
    }
}

impl From<String> for LanguageLabel {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() || normalized == Self::UNKNOWN || normalized == "auto" {
            LanguageLabel::Unknown
        } else {
            LanguageLabel::Code(normalized)
        }
    }
}

impl From<LanguageLabel> for String {
    fn from(value: LanguageLabel) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for LanguageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Statistical,
    ShortText,
    Override,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDetection {
    pub label: LanguageLabel,
    pub confidence: f64,
    pub method: DetectionMethod,
    pub ambiguous: bool,
}

impl LanguageDetection {
    pub fn unknown() -> Self {
        Self {
            label: LanguageLabel::Unknown,
            confidence: 0.0,
            method: DetectionMethod::Fallback,
            ambiguous: false,
        }
    }
}

// ============================================================================
// NLP annotations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NlpTier {
    Statistical,
    Transformer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityLabel {
    Person,
    Org,
    Loc,
    Gpe,
    Date,
    Misc,
}

impl EntityLabel {
    /// Maps a model label (`PER`, `B-ORG`, `I-LOC`, `DATE`, ...) to an entity label.
    pub fn from_model_label(label: &str) -> Option<Self> {
        let bare = label
            .strip_prefix("B-")
            .or_else(|| label.strip_prefix("I-"))
            .or_else(|| label.strip_prefix("E-"))
            .or_else(|| label.strip_prefix("S-"))
            .unwrap_or(label);
        match bare.to_ascii_uppercase().as_str() {
            "PER" | "PERSON" => Some(EntityLabel::Person),
            "ORG" | "ORGANIZATION" => Some(EntityLabel::Org),
            "LOC" | "LOCATION" => Some(EntityLabel::Loc),
            "GPE" => Some(EntityLabel::Gpe),
            "DATE" | "TIME" => Some(EntityLabel::Date),
            "MISC" => Some(EntityLabel::Misc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTag {
    Word,
    ProperNoun,
    Number,
    Punct,
    Symbol,
    Email,
    Url,
}

/// A token over the annotated text; `start`/`end` are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub tag: TokenTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A typed entity span over the annotated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub label: EntityLabel,
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub score: f32,
}

impl EntitySpan {
    pub fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.end,
        }
    }
}

/// A noun phrase found by the shallow parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NounChunk {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub token_count: usize,
    pub sentence_count: usize,
    pub entity_count: usize,
    pub noun_chunk_count: usize,
}

/// Output of the NLP processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    pub language: LanguageLabel,
    pub tier: NlpTier,
    pub model: String,
    pub tokens: Vec<Token>,
    pub sentences: Vec<Span>,
    pub entities: Vec<EntitySpan>,
    #[serde(default)]
    pub noun_chunks: Vec<NounChunk>,
}

impl AnnotationSet {
    pub fn empty(language: LanguageLabel, tier: NlpTier, model: impl Into<String>) -> Self {
        Self {
            language,
            tier,
            model: model.into(),
            tokens: Vec::new(),
            sentences: Vec::new(),
            entities: Vec::new(),
            noun_chunks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.entities.is_empty()
    }

    pub fn entities_with(&self, label: EntityLabel) -> impl Iterator<Item = &EntitySpan> {
        self.entities.iter().filter(move |e| e.label == label)
    }

    /// Entities fully inside `span`.
    pub fn entities_in(&self, span: Span) -> impl Iterator<Item = &EntitySpan> {
        self.entities.iter().filter(move |e| span.contains(&e.span()))
    }

    pub fn stats(&self) -> DocumentStats {
        DocumentStats {
            token_count: self.tokens.len(),
            sentence_count: self.sentences.len(),
            entity_count: self.entities.len(),
            noun_chunk_count: self.noun_chunks.len(),
        }
    }
}

// ============================================================================
// Extracted record
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    Hard,
    Soft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub skill: String,
    pub confidence: f64,
    pub match_kind: MatchKind,
    pub category: SkillCategory,
}

/// Normalized date range. Dates are `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
    /// The range is ongoing ("present", "sekarang").
    pub current: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub dates: DateRange,
    pub raw: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: Option<String>,
    pub title: Option<String>,
    pub dates: DateRange,
    pub responsibilities: Vec<String>,
    pub raw: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub overall: f64,
    pub personal_info: f64,
    pub skills: f64,
    pub education: f64,
    pub work_experience: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub name_valid: bool,
    pub email_valid: bool,
    pub phone_valid: bool,
    pub address_valid: bool,
    pub personal_info_score: f64,
    pub education_score: f64,
    pub experience_score: f64,
    pub skills_score: f64,
    pub overall_score: f64,
}

/// Which strategy produced a field value, and how sure it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub strategy: String,
    pub confidence: f64,
}

/// Structured record produced for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub source: String,
    pub language: LanguageLabel,
    pub language_confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_confidence: Option<f64>,
    pub text_source: TextSource,
    pub personal_info: PersonalInfo,
    pub skills: Vec<SkillMatch>,
    pub education: Vec<EducationEntry>,
    pub work_experience: Vec<ExperienceEntry>,
    pub languages: Vec<String>,
    pub certifications: Vec<String>,
    pub summary: Option<String>,
    pub confidence: ConfidenceScores,
    pub validation: ValidationReport,
    pub provenance: BTreeMap<String, Provenance>,
    pub missing_fields: Vec<String>,
    pub warnings: Vec<String>,
}

impl ExtractedRecord {
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            language: LanguageLabel::Unknown,
            language_confidence: 0.0,
            ocr_confidence: None,
            text_source: TextSource::Direct,
            personal_info: PersonalInfo::default(),
            skills: Vec::new(),
            education: Vec::new(),
            work_experience: Vec::new(),
            languages: Vec::new(),
            certifications: Vec::new(),
            summary: None,
            confidence: ConfidenceScores::default(),
            validation: ValidationReport::default(),
            provenance: BTreeMap::new(),
            missing_fields: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn skill_names(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.skill.as_str()).collect()
    }

    /// Flattens the record into ordered string columns for tabular export.
    pub fn to_flat_row(&self) -> IndexMap<String, String> {
        fn join<T>(items: &[T], f: impl Fn(&T) -> String) -> String {
            items.iter().map(f).filter(|s| !s.is_empty()).collect::<Vec<_>>().join("; ")
        }

        let opt = |value: &Option<String>| value.clone().unwrap_or_default();
        let mut row = IndexMap::new();
        row.insert("filename".to_string(), self.source.clone());
        row.insert("language".to_string(), self.language.to_string());
        row.insert("language_confidence".to_string(), format!("{:.2}", self.language_confidence));
        row.insert(
            "ocr_confidence".to_string(),
            self.ocr_confidence.map(|c| format!("{:.1}", c)).unwrap_or_default(),
        );
        row.insert("name".to_string(), opt(&self.personal_info.name));
        row.insert("email".to_string(), opt(&self.personal_info.email));
        row.insert("phone".to_string(), opt(&self.personal_info.phone));
        row.insert("address".to_string(), opt(&self.personal_info.address));
        row.insert("skills".to_string(), join(&self.skills, |s| s.skill.clone()));
        row.insert(
            "education".to_string(),
            join(&self.education, |e| {
                [e.degree.as_deref(), e.institution.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(", ")
            }),
        );
        row.insert(
            "work_experience".to_string(),
            join(&self.work_experience, |e| {
                [e.title.as_deref(), e.company.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" @ ")
            }),
        );
        row.insert("languages".to_string(), self.languages.join("; "));
        row.insert("certifications".to_string(), self.certifications.join("; "));
        row.insert("summary".to_string(), opt(&self.summary));
        row.insert("overall_confidence".to_string(), format!("{:.2}", self.confidence.overall));
        row.insert("validation_score".to_string(), format!("{:.2}", self.validation.overall_score));
        row
    }
}

// ============================================================================
// Bulk processing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub kind: String,
    pub message: String,
}

impl From<&crate::CvError> for DocumentFailure {
    fn from(err: &crate::CvError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// One row of a bulk run: either a record or a failure marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub source: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ExtractedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DocumentFailure>,
}

impl BatchItemResult {
    pub fn ok(record: ExtractedRecord) -> Self {
        Self {
            source: record.source.clone(),
            success: true,
            record: Some(record),
            error: None,
        }
    }

    pub fn failed(source: impl Into<String>, err: &crate::CvError) -> Self {
        Self {
            source: source.into(),
            success: false,
            record: None,
            error: Some(DocumentFailure::from(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_label_serde_as_string() {
        let label = LanguageLabel::code("ENG");
        assert_eq!(serde_json::to_string(&label).unwrap(), "\"eng\"");
        let unknown: LanguageLabel = serde_json::from_str("\"unknown\"").unwrap();
        assert!(unknown.is_unknown());
        let auto: LanguageLabel = serde_json::from_str("\"auto\"").unwrap();
        assert!(auto.is_unknown());
    }

    #[test]
    fn test_entity_label_from_model_label() {
        assert_eq!(EntityLabel::from_model_label("B-PER"), Some(EntityLabel::Person));
        assert_eq!(EntityLabel::from_model_label("I-ORG"), Some(EntityLabel::Org));
        assert_eq!(EntityLabel::from_model_label("GPE"), Some(EntityLabel::Gpe));
        assert_eq!(EntityLabel::from_model_label("O"), None);
    }

    #[test]
    fn test_ocr_result_from_pages_joins_and_averages() {
        let result = OcrResult::from_pages(vec![
            PageResult {
                page_number: 1,
                text: "first page".to_string(),
                confidence: Some(80.0),
                source: TextSource::Ocr,
            },
            PageResult {
                page_number: 2,
                text: "   ".to_string(),
                confidence: None,
                source: TextSource::Ocr,
            },
            PageResult {
                page_number: 3,
                text: "third page".to_string(),
                confidence: Some(90.0),
                source: TextSource::Direct,
            },
        ]);
        assert_eq!(result.text, "first page\n\nthird page");
        assert_eq!(result.mean_confidence, Some(85.0));
        assert_eq!(result.source, TextSource::Mixed);
    }

    #[test]
    fn test_document_stem() {
        let doc = Document::new("bundle.zip/cv/jane.smith.pdf", Vec::<u8>::new(), FileKind::Pdf);
        assert_eq!(doc.stem(), "jane.smith");
        let hidden = Document::new(".profile", Vec::<u8>::new(), FileKind::PlainText);
        assert_eq!(hidden.stem(), ".profile");
    }

    #[test]
    fn test_flat_row_column_order() {
        let mut record = ExtractedRecord::empty("cv.pdf");
        record.personal_info.email = Some("a@b.io".to_string());
        let row = record.to_flat_row();
        let keys: Vec<&str> = row.keys().map(|k| k.as_str()).collect();
        assert_eq!(&keys[..4], &["filename", "language", "language_confidence", "ocr_confidence"]);
        assert_eq!(row["email"], "a@b.io");
        assert_eq!(row["name"], "");
    }
}
