//! Word lists behind the statistical recognizer.

use ahash::AHashSet;
use once_cell::sync::Lazy;

/// Countries and cities, tagged `GPE`.
pub const GPE: &[&str] = &[
    // countries
    "Indonesia", "Malaysia", "Singapore", "Thailand", "Vietnam", "Philippines", "Japan", "China", "India",
    "Australia", "New Zealand", "United States", "USA", "United Kingdom", "UK", "Canada", "Germany", "France",
    "Netherlands", "Belanda", "Spain", "Italy", "Brazil", "Mexico", "South Korea", "Korea", "Taiwan",
    "Hong Kong", "Saudi Arabia", "United Arab Emirates", "UAE", "Qatar", "Ireland", "Sweden", "Norway",
    "Denmark", "Finland", "Switzerland", "Austria", "Belgium", "Poland", "Portugal", "Egypt", "Nigeria",
    "Kenya", "South Africa", "Jepang", "Jerman", "Perancis", "Amerika Serikat", "Inggris", "Tiongkok",
    // cities
    "Jakarta", "Bandung", "Surabaya", "Yogyakarta", "Semarang", "Medan", "Makassar", "Denpasar", "Malang",
    "Bogor", "Depok", "Tangerang", "Bekasi", "Palembang", "Batam", "Pekanbaru", "Balikpapan", "Manado",
    "Padang", "Solo", "Surakarta", "Kuala Lumpur", "Bangkok", "Manila", "Hanoi", "Ho Chi Minh City",
    "Tokyo", "Osaka", "Seoul", "Beijing", "Shanghai", "Shenzhen", "Mumbai", "Bangalore", "Bengaluru",
    "New Delhi", "Delhi", "Sydney", "Melbourne", "Brisbane", "Perth", "Auckland", "London", "Manchester",
    "Edinburgh", "Dublin", "Paris", "Berlin", "Munich", "Hamburg", "Amsterdam", "Rotterdam", "Madrid",
    "Barcelona", "Rome", "Milan", "Zurich", "Geneva", "Vienna", "Stockholm", "Oslo", "Copenhagen",
    "Helsinki", "Warsaw", "Lisbon", "Brussels", "New York", "San Francisco", "Los Angeles", "Seattle",
    "Chicago", "Boston", "Austin", "Toronto", "Vancouver", "Montreal", "Dubai", "Abu Dhabi", "Doha",
    "Riyadh", "Cairo", "Lagos", "Nairobi", "Cape Town", "Sao Paulo", "São Paulo", "Mexico City",
];

/// Regions, islands and other non-political locations, tagged `LOC`.
pub const LOC: &[&str] = &[
    "Java", "Jawa", "Sumatra", "Sumatera", "Bali", "Kalimantan", "Borneo", "Sulawesi", "Papua", "Lombok",
    "West Java", "Jawa Barat", "Central Java", "Jawa Tengah", "East Java", "Jawa Timur", "Banten",
    "Southeast Asia", "Asia", "Europe", "Africa", "North America", "South America", "Middle East",
    "Silicon Valley", "Bay Area",
];

/// Words that make a title-case run an organisation.
pub const ORG_KEYWORDS: &[&str] = &[
    "University", "Universitas", "Institute", "Institut", "College", "School", "Sekolah", "Academy",
    "Akademi", "Politeknik", "Polytechnic", "SMA", "SMK", "SMP", "PT", "CV", "Tbk", "Inc", "Corp",
    "Corporation", "Ltd", "LLC", "GmbH", "Company", "Co", "Group", "Bank", "Technologies",
    "Solutions", "Labs", "Systems", "Foundation", "Yayasan", "Agency", "Ministry", "Kementerian",
    "Hospital", "Consulting", "Studio", "Partners", "Persero",
];

/// Well-known employers that carry no organisation keyword.
pub const KNOWN_ORGS: &[&str] = &[
    "Google", "Microsoft", "Amazon", "Apple", "Meta", "Facebook", "IBM", "Oracle", "Intel", "Netflix",
    "Spotify", "Uber", "Airbnb", "Salesforce", "SAP", "Accenture", "Deloitte", "Capgemini", "Infosys",
    "Tokopedia", "Gojek", "GoTo", "Traveloka", "Bukalapak", "Shopee", "Grab", "Telkom", "Telkomsel",
    "Indosat", "Pertamina", "Blibli", "Ruangguru", "Lazada", "Xendit", "OVO",
];

/// Job-title words; a line made of these is not a person's name.
pub const TITLE_WORDS: &[&str] = &[
    "Engineer", "Developer", "Manager", "Analyst", "Designer", "Consultant", "Intern", "Officer", "Director",
    "Lead", "Scientist", "Specialist", "Administrator", "Architect", "Staff", "Assistant", "Programmer",
    "Head", "Senior", "Junior", "Principal", "Coordinator", "Supervisor", "Executive", "Associate",
    "Curriculum", "Vitae", "Resume", "Profile", "Profil", "Teacher", "Lecturer", "Dosen", "Guru",
    "Accountant", "Marketing", "Sales", "Technician", "Operator", "Karyawan", "Magang", "Bachelor",
    "Master", "Sarjana", "Diploma", "Degree", "Science", "Computer", "Information", "Reference", "References",
];

/// Lowercase connectors allowed inside an organisation name.
pub const CONNECTORS: &[&str] = &["of", "and", "&", "de", "dan", "for", "the", "van", "der"];

fn set(words: &'static [&'static str]) -> AHashSet<&'static str> {
    words.iter().copied().collect()
}

static ORG_KEYWORD_SET: Lazy<AHashSet<String>> =
    Lazy::new(|| ORG_KEYWORDS.iter().map(|w| w.to_lowercase()).collect());
static KNOWN_ORG_SET: Lazy<AHashSet<&'static str>> = Lazy::new(|| set(KNOWN_ORGS));
static TITLE_WORD_SET: Lazy<AHashSet<String>> =
    Lazy::new(|| TITLE_WORDS.iter().map(|w| w.to_lowercase()).collect());
static CONNECTOR_SET: Lazy<AHashSet<&'static str>> = Lazy::new(|| set(CONNECTORS));

/// Case-insensitive, ignoring a trailing period (`Inc.`, `Co.`).
pub fn is_org_keyword(word: &str) -> bool {
    ORG_KEYWORD_SET.contains(&word.trim_end_matches('.').to_lowercase())
}

pub fn is_known_org(word: &str) -> bool {
    KNOWN_ORG_SET.contains(word)
}

pub fn is_connector(word: &str) -> bool {
    CONNECTOR_SET.contains(word)
}

pub fn is_title_word(word: &str) -> bool {
    TITLE_WORD_SET.contains(&word.to_lowercase())
}
