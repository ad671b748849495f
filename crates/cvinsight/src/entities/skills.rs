//! Skills dictionary and exact/fuzzy skill matching.
//!
//! Text is cut into segments at line breaks and list separators, and every
//! word n-gram of a segment (up to `max_ngram` words) is looked up. Exact
//! matches are case-insensitive and alias aware. Fuzzy matches compare
//! token-sorted strings of the same word count with normalized Levenshtein
//! similarity. Entries from a per-language dictionary file only match
//! documents in that language; built-in entries match every document.

use crate::core::config::SkillsConfig;
use crate::types::{LanguageLabel, MatchKind, SkillCategory, SkillMatch};
use crate::{CvError, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUILTIN_HARD: &[&str] = &[
    "Python", "Java", "JavaScript", "TypeScript", "C++", "C#", "Golang", "Rust", "Ruby", "PHP", "Kotlin",
    "Swift", "Scala", "MATLAB", "Perl", "Dart", "Elixir", "Haskell", "SQL", "NoSQL", "HTML", "CSS", "Sass",
    "Bash", "PowerShell", "React", "React Native", "Angular", "Vue.js", "Next.js", "Node.js", "Express.js",
    "Django", "Flask", "FastAPI", "Spring Boot", "Laravel", "CodeIgniter", "Ruby on Rails", "ASP.NET", ".NET",
    "Flutter", "jQuery", "Bootstrap", "Tailwind CSS", "GraphQL", "REST API", "gRPC", "Microservices",
    "PostgreSQL", "MySQL", "SQLite", "MongoDB", "Redis", "Elasticsearch", "Cassandra", "Oracle Database",
    "Microsoft SQL Server", "Kafka", "RabbitMQ", "Docker", "Kubernetes", "Terraform", "Ansible", "Jenkins",
    "GitHub Actions", "GitLab CI", "CI/CD", "Git", "Linux", "Nginx", "Apache", "AWS", "Google Cloud Platform",
    "Microsoft Azure", "Firebase", "Machine Learning", "Deep Learning", "Natural Language Processing",
    "Computer Vision", "Data Analysis", "Data Science", "Data Engineering", "Data Visualization",
    "Statistics", "TensorFlow", "PyTorch", "Keras", "scikit-learn", "Pandas", "NumPy", "Apache Spark",
    "Hadoop", "Airflow", "Power BI", "Tableau", "Excel", "Microsoft Office", "Google Analytics", "SEO",
    "Digital Marketing", "Photoshop", "Illustrator", "Figma", "Adobe XD", "UI/UX Design", "AutoCAD",
    "SAP", "Salesforce", "Jira", "Agile", "Scrum", "Kanban", "Unit Testing", "Selenium", "Cypress",
    "Android Development", "iOS Development", "Cybersecurity", "Penetration Testing", "Networking",
    "Blockchain", "Accounting", "Financial Analysis", "Budgeting", "Copywriting", "Akuntansi",
    "Analisis Data", "Pemrograman", "Desain Grafis", "Jaringan Komputer",
];

const BUILTIN_SOFT: &[&str] = &[
    "Communication", "Leadership", "Teamwork", "Project Management", "Problem Solving", "Critical Thinking",
    "Creativity", "Adaptability", "Time Management", "Negotiation", "Public Speaking", "Presentation",
    "Collaboration", "Mentoring", "Customer Service", "Stakeholder Management", "Komunikasi",
    "Kepemimpinan", "Kerja Tim", "Manajemen Proyek", "Pemecahan Masalah", "Berpikir Kritis", "Kreativitas",
    "Manajemen Waktu", "Adaptasi", "Negosiasi",
];

/// Aliases for built-in skills, as (alias, canonical).
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("js", "JavaScript"),
    ("ts", "TypeScript"),
    ("go lang", "Golang"),
    ("postgres", "PostgreSQL"),
    ("k8s", "Kubernetes"),
    ("reactjs", "React"),
    ("react.js", "React"),
    ("vue", "Vue.js"),
    ("vuejs", "Vue.js"),
    ("nodejs", "Node.js"),
    ("expressjs", "Express.js"),
    ("nextjs", "Next.js"),
    ("dotnet", ".NET"),
    ("gcp", "Google Cloud Platform"),
    ("azure", "Microsoft Azure"),
    ("amazon web services", "AWS"),
    ("ml", "Machine Learning"),
    ("nlp", "Natural Language Processing"),
    ("sklearn", "scikit-learn"),
    ("spark", "Apache Spark"),
    ("ms excel", "Excel"),
    ("microsoft excel", "Excel"),
    ("ms office", "Microsoft Office"),
    ("rails", "Ruby on Rails"),
    ("ci cd", "CI/CD"),
    ("ui ux", "UI/UX Design"),
    ("problem-solving", "Problem Solving"),
    ("team work", "Teamwork"),
];

/// Keywords that mark a skill as soft.
const SOFT_KEYWORDS: &[&str] = &[
    "communication", "leadership", "teamwork", "management", "organization", "problem solving", "creativity",
    "critical thinking", "adaptability", "negotiation", "presentation", "collaboration", "mentoring",
    "public speaking", "customer service", "komunikasi", "kepemimpinan", "kerja tim", "manajemen",
    "organisasi", "pemecahan masalah", "kreativitas", "berpikir kritis", "adaptasi", "negosiasi",
];

/// A dictionary entry as written in a JSON dictionary file: either a bare
/// name or an object with aliases and an explicit category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillDefinition {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        aliases: Vec<String>,
        #[serde(default)]
        category: Option<SkillCategory>,
    },
}

#[derive(Debug, Clone)]
struct SkillEntry {
    canonical: String,
    category: SkillCategory,
    /// Empty when the skill applies to every language.
    languages: Vec<String>,
}

impl SkillEntry {
    fn applies_to(&self, language: Option<&str>) -> bool {
        match language {
            Some(language) if !self.languages.is_empty() => self.languages.iter().any(|l| l == language),
            _ => true,
        }
    }
}

#[derive(Debug, Clone)]
struct Variant {
    /// Words sorted, for fuzzy comparison.
    sorted: String,
    char_len: usize,
    entry: usize,
}

/// Canonical skill names with their aliases.
#[derive(Debug, Clone, Default)]
pub struct SkillsDictionary {
    entries: Vec<SkillEntry>,
    by_canonical: AHashMap<String, usize>,
    exact: AHashMap<String, usize>,
    by_word_count: AHashMap<usize, Vec<Variant>>,
}

/// Lowercase and strip surrounding punctuation, keeping `+`, `#` and inner dots.
fn normalize_word(word: &str) -> String {
    word.trim_end_matches(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Words of a phrase; `/` and `-` separate words as whitespace does.
fn normalize_phrase(phrase: &str) -> Vec<String> {
    phrase
        .split(|c: char| c.is_whitespace() || c == '/' || c == '-')
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect()
}

fn sorted_key(words: &[String]) -> String {
    let mut sorted: Vec<&str> = words.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(" ")
}

fn categorize(name: &str) -> SkillCategory {
    let lower = name.to_lowercase();
    if SOFT_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        SkillCategory::Soft
    } else {
        SkillCategory::Hard
    }
}

impl SkillsDictionary {
    /// The bundled English and Indonesian skill list.
    pub fn builtin() -> Self {
        let mut dictionary = Self::default();
        for name in BUILTIN_HARD.iter().chain(BUILTIN_SOFT) {
            dictionary.add(name, &[], None, None);
        }
        for (alias, canonical) in BUILTIN_ALIASES {
            dictionary.add(canonical, &[alias.to_string()], None, None);
        }
        dictionary
    }

    /// Built-in list merged with every dictionary file named in `config`.
    /// Each file's skills are scoped to the language it is keyed by.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured dictionary file cannot be read or parsed.
    pub fn from_config(config: &SkillsConfig) -> Result<Self> {
        let mut dictionary = Self::builtin();
        for (language, path) in &config.dictionaries {
            let definitions = Self::load_json(path)?;
            tracing::info!(language, path = %path.display(), count = definitions.len(), "Loaded skills dictionary");
            dictionary.extend_language(language, definitions);
        }
        Ok(dictionary)
    }

    /// Read a JSON array of [`SkillDefinition`]s.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Vec<SkillDefinition>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            CvError::serialization_with_source(format!("Invalid skills dictionary {}", path.display()), e)
        })
    }

    pub fn from_definitions(definitions: impl IntoIterator<Item = SkillDefinition>) -> Self {
        let mut dictionary = Self::default();
        dictionary.extend(definitions);
        dictionary
    }

    /// Add skills that apply to every language.
    pub fn extend(&mut self, definitions: impl IntoIterator<Item = SkillDefinition>) {
        self.extend_scoped(None, definitions);
    }

    /// Add skills that only match documents in `language`.
    pub fn extend_language(&mut self, language: &str, definitions: impl IntoIterator<Item = SkillDefinition>) {
        self.extend_scoped(Some(&language.to_lowercase()), definitions);
    }

    fn extend_scoped(&mut self, language: Option<&str>, definitions: impl IntoIterator<Item = SkillDefinition>) {
        for definition in definitions {
            match definition {
                SkillDefinition::Name(name) => self.add(&name, &[], None, language),
                SkillDefinition::Detailed { name, aliases, category } => {
                    self.add(&name, &aliases, category, language)
                }
            }
        }
    }

    fn add(&mut self, canonical: &str, aliases: &[String], category: Option<SkillCategory>, language: Option<&str>) {
        let canonical = canonical.trim();
        if canonical.is_empty() {
            return;
        }

        let key = canonical.to_lowercase();
        let entry = match self.by_canonical.get(&key) {
            Some(&index) => {
                let existing = &mut self.entries[index];
                if let Some(category) = category {
                    existing.category = category;
                }
                match language {
                    None => existing.languages.clear(),
                    Some(language) => {
                        if !existing.languages.is_empty() && !existing.languages.iter().any(|l| l == language) {
                            existing.languages.push(language.to_string());
                        }
                    }
                }
                index
            }
            None => {
                self.entries.push(SkillEntry {
                    canonical: canonical.to_string(),
                    category: category.unwrap_or_else(|| categorize(canonical)),
                    languages: language.map(str::to_string).into_iter().collect(),
                });
                let index = self.entries.len() - 1;
                self.by_canonical.insert(key, index);
                index
            }
        };

        for variant in std::iter::once(canonical).chain(aliases.iter().map(String::as_str)) {
            let words = normalize_phrase(variant);
            if words.is_empty() {
                continue;
            }
            let normalized = words.join(" ");
            if self.exact.contains_key(&normalized) {
                continue;
            }
            let char_len = normalized.chars().count();
            self.exact.insert(normalized, entry);
            self.by_word_count.entry(words.len()).or_default().push(Variant {
                char_len,
                sorted: sorted_key(&words),
                entry,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical name for an exact (case-insensitive, alias-aware) lookup.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        let normalized = normalize_phrase(name).join(" ");
        self.exact
            .get(&normalized)
            .map(|&i| self.entries[i].canonical.as_str())
    }

    fn best_fuzzy(&self, words: &[String], language: Option<&str>, config: &SkillsConfig) -> Option<(usize, f64)> {
        let normalized = words.join(" ");
        if normalized.chars().count() < config.min_fuzzy_length {
            return None;
        }
        let sorted = sorted_key(words);

        let mut best: Option<(usize, f64)> = None;
        for variant in self.by_word_count.get(&words.len())? {
            if variant.char_len < config.min_fuzzy_length || !self.entries[variant.entry].applies_to(language) {
                continue;
            }
            let similarity = strsim::normalized_levenshtein(&sorted, &variant.sorted);
            if similarity >= config.fuzzy_threshold && best.is_none_or(|(_, s)| similarity > s) {
                best = Some((variant.entry, similarity));
            }
        }
        best
    }

    /// Skills mentioned in `text`, deduplicated by canonical name and ordered
    /// by first occurrence. A skill matched several ways keeps its best score.
    /// Every entry is eligible regardless of language.
    pub fn match_skills(&self, text: &str, config: &SkillsConfig) -> Vec<SkillMatch> {
        self.match_scoped(text, None, config)
    }

    /// As [`match_skills`](Self::match_skills), limited to built-in skills
    /// and those loaded for `language`. `unknown` leaves every entry eligible.
    pub fn match_skills_in(&self, text: &str, language: &LanguageLabel, config: &SkillsConfig) -> Vec<SkillMatch> {
        let language = (!language.is_unknown()).then(|| language.as_str().to_lowercase());
        self.match_scoped(text, language.as_deref(), config)
    }

    fn match_scoped(&self, text: &str, language: Option<&str>, config: &SkillsConfig) -> Vec<SkillMatch> {
        let max_ngram = config.max_ngram.max(1);
        let mut found: Vec<(usize, f64, MatchKind)> = Vec::new();
        let mut position: AHashMap<usize, usize> = AHashMap::new();

        let segments = text.split(|c: char| matches!(c, '\n' | ',' | ';' | '|' | '•' | '·' | '(' | ')' | ':'));
        for segment in segments {
            let words = normalize_phrase(segment);

            for start in 0..words.len() {
                for len in 1..=max_ngram.min(words.len() - start) {
                    let gram = &words[start..start + len];
                    let key = gram.join(" ");

                    let exact = self.exact.get(&key).filter(|&&e| self.entries[e].applies_to(language));
                    let hit = match exact {
                        Some(&entry) => Some((entry, 1.0, MatchKind::Exact)),
                        None => self
                            .best_fuzzy(gram, language, config)
                            .map(|(entry, score)| (entry, score, MatchKind::Fuzzy)),
                    };
                    let Some((entry, score, kind)) = hit else {
                        continue;
                    };

                    match position.get(&entry) {
                        Some(&at) => {
                            if score > found[at].1 {
                                found[at] = (entry, score, kind);
                            }
                        }
                        None => {
                            position.insert(entry, found.len());
                            found.push((entry, score, kind));
                        }
                    }
                }
            }
        }

        found
            .into_iter()
            .map(|(entry, score, kind)| {
                let skill = &self.entries[entry];
                SkillMatch {
                    skill: skill.canonical.clone(),
                    confidence: score,
                    match_kind: kind,
                    category: skill.category,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config() -> SkillsConfig {
        SkillsConfig::default()
    }

    fn names(matches: &[SkillMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.skill.as_str()).collect()
    }

    #[test]
    fn test_exact_matches_in_order() {
        let dictionary = SkillsDictionary::builtin();
        let matches = dictionary.match_skills("Skills: Rust, python, Docker\nLed a team using Kubernetes", &config());
        assert_eq!(names(&matches), vec!["Rust", "Python", "Docker", "Kubernetes"]);
        assert!(matches.iter().all(|m| m.match_kind == MatchKind::Exact && m.confidence == 1.0));
    }

    #[test]
    fn test_fuzzy_threshold() {
        let dictionary = SkillsDictionary::builtin();

        let matches = dictionary.match_skills("Javascrpt", &config());
        assert_eq!(names(&matches), vec!["JavaScript"]);
        assert_eq!(matches[0].match_kind, MatchKind::Fuzzy);
        assert!(matches[0].confidence >= 0.85);

        assert!(dictionary.match_skills("Jvscrpt", &config()).is_empty());
    }

    #[test]
    fn test_short_words_only_match_exactly() {
        let dictionary = SkillsDictionary::builtin();
        let matches = dictionary.match_skills("Gi, Rusty", &config());
        assert!(!names(&matches).contains(&"Git"));
        assert!(!names(&matches).contains(&"Rust"));
    }

    #[test]
    fn test_aliases_and_duplicates_collapse() {
        let dictionary = SkillsDictionary::builtin();
        let matches = dictionary.match_skills("k8s, Kubernetes, golang, Go Lang", &config());
        assert_eq!(names(&matches), vec!["Kubernetes", "Golang"]);
    }

    #[test]
    fn test_multi_word_and_symbols() {
        let dictionary = SkillsDictionary::builtin();
        let matches = dictionary.match_skills("C++ and C# developer; Machine Learning; Node.js", &config());
        let found = names(&matches);
        assert!(found.contains(&"C++"));
        assert!(found.contains(&"C#"));
        assert!(found.contains(&"Machine Learning"));
        assert!(found.contains(&"Node.js"));
    }

    #[test]
    fn test_categories() {
        let dictionary = SkillsDictionary::builtin();
        let matches = dictionary.match_skills("Leadership, Kerja Tim, SQL", &config());
        let category = |name: &str| matches.iter().find(|m| m.skill == name).map(|m| m.category);
        assert_eq!(category("Leadership"), Some(SkillCategory::Soft));
        assert_eq!(category("Kerja Tim"), Some(SkillCategory::Soft));
        assert_eq!(category("SQL"), Some(SkillCategory::Hard));
    }

    #[test]
    fn test_from_config_merges_json_dictionary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("extra.json");
        std::fs::write(
            &path,
            r#"["Solidity", {"name": "Pengelolaan Gudang", "aliases": ["manajemen gudang"], "category": "hard"}]"#,
        )
        .unwrap();

        let mut cfg = config();
        cfg.dictionaries.insert("ind".to_string(), path);
        let dictionary = SkillsDictionary::from_config(&cfg).unwrap();

        assert_eq!(dictionary.canonical("solidity"), Some("Solidity"));
        let matches = dictionary.match_skills("Manajemen Gudang", &cfg);
        assert_eq!(names(&matches), vec!["Pengelolaan Gudang"]);
        assert_eq!(matches[0].category, SkillCategory::Hard);
    }

    #[test]
    fn test_language_dictionaries_stay_in_their_language() {
        let dir = tempdir().unwrap();
        let ind = dir.path().join("ind.json");
        let eng = dir.path().join("eng.json");
        std::fs::write(&ind, r#"["Pengelolaan Gudang", "Solidity"]"#).unwrap();
        std::fs::write(&eng, r#"["Warehouse Management", "Solidity"]"#).unwrap();

        let mut cfg = config();
        cfg.dictionaries.insert("ind".to_string(), ind);
        cfg.dictionaries.insert("eng".to_string(), eng);
        let dictionary = SkillsDictionary::from_config(&cfg).unwrap();
        let text = "Pengelolaan Gudang, Warehouse Management, Solidity, SQL";

        let indonesian = dictionary.match_skills_in(text, &LanguageLabel::code("ind"), &cfg);
        assert_eq!(names(&indonesian), vec!["Pengelolaan Gudang", "Solidity", "SQL"]);

        let english = dictionary.match_skills_in(text, &LanguageLabel::code("eng"), &cfg);
        assert_eq!(names(&english), vec!["Warehouse Management", "Solidity", "SQL"]);

        let unknown = dictionary.match_skills_in(text, &LanguageLabel::Unknown, &cfg);
        assert_eq!(unknown.len(), 4);
    }

    #[test]
    fn test_scoped_entries_are_not_fuzzy_matched_elsewhere() {
        let mut dictionary = SkillsDictionary::builtin();
        dictionary.extend_language("ind", [SkillDefinition::Name("Pengelolaan Gudang".to_string())]);
        let eng = LanguageLabel::code("eng");
        assert!(dictionary.match_skills_in("Pengelolaan Gudnag", &eng, &config()).is_empty());
        let ind = LanguageLabel::code("ind");
        let matches = dictionary.match_skills_in("Pengelolaan Gudnag", &ind, &config());
        assert_eq!(names(&matches), vec!["Pengelolaan Gudang"]);
    }

    #[test]
    fn test_missing_dictionary_file_is_error() {
        let mut cfg = config();
        cfg.dictionaries
            .insert("eng".to_string(), std::path::PathBuf::from("/nonexistent/skills.json"));
        assert!(SkillsDictionary::from_config(&cfg).is_err());
    }
}
