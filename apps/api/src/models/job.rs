use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::models::dates::normalize_date;

/// Shown in the tracking row when a posting has no deadline.
pub const DEADLINE_SENTINEL: &str = "Not specified";

/// Raw deadline values that sites (or older extension builds) use for "no deadline".
const NO_DEADLINE_MARKERS: &[&str] = &[
    "notfound",
    "not specified",
    "ikke oppgitt",
    "ikkje oppgitt",
];

pub const DEFAULT_MAX_WORDS: u32 = 350;

/// One scraped job posting plus the user's annotations.
///
/// `(title, company, created_at)` is the dedup key. Every field defaults to
/// empty so partially filled records from the extension still deserialize;
/// `validate` enforces what the submission pipeline needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub created_at: String,
    pub deadline: Deadline,
    pub added_at: String,
    pub url: String,
    pub sector: String,
    pub location: String,
    pub industry: String,
    pub job_function: String,
    pub work_language: String,
    pub keywords: String,
    pub job_description: String,
    pub company_description: String,
    pub html_content: String,
    pub notes: String,
    pub pros: String,
    pub cons: String,
    pub next_steps: String,
    pub sent_at: String,
    pub rejected_at: String,
    pub generation_settings: GenerationSettings,
    pub generated_document_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    pub language: String,
    pub tone: String,
    /// Empty means the service-wide default model.
    pub model: String,
    pub resume_template: String,
    pub max_words: u32,
    pub generate_cover_letter: bool,
    #[serde(rename = "generateCV")]
    pub generate_cv: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            tone: "professional".to_string(),
            model: String::new(),
            resume_template: "simple".to_string(),
            max_words: DEFAULT_MAX_WORDS,
            generate_cover_letter: false,
            generate_cv: false,
        }
    }
}

/// Application deadline. Serialized as a string, or `null` when not specified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Deadline {
    #[default]
    NotSpecified,
    On(String),
}

impl Deadline {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Deadline::NotSpecified,
            Some(s) if NO_DEADLINE_MARKERS.contains(&s.to_lowercase().as_str()) => {
                Deadline::NotSpecified
            }
            Some(s) => Deadline::On(s.to_string()),
        }
    }

    /// Text shown in the tracking row.
    pub fn display(&self) -> &str {
        match self {
            Deadline::NotSpecified => DEADLINE_SENTINEL,
            Deadline::On(s) => s,
        }
    }
}

impl Serialize for Deadline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Deadline::NotSpecified => serializer.serialize_none(),
            Deadline::On(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Deadline {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Deadline::from_raw(raw.as_deref()))
    }
}

/// The `(title, company, createdAt)` triple that identifies a posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupKey {
    pub title: String,
    pub company: String,
    pub created_at: String,
}

impl DedupKey {
    /// Compares against a row read as `[title, company, createdAt, ...]`.
    pub fn matches_row(&self, row: &[String]) -> bool {
        match row {
            [title, company, created_at, ..] => {
                *title == self.title && *company == self.company && *created_at == self.created_at
            }
            _ => false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Job record is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("No HTML content provided in job.htmlContent")]
    MissingHtml,
}

impl JobRecord {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            title: self.title.clone(),
            company: self.company.clone(),
            created_at: self.created_at.clone(),
        }
    }

    /// Checks the invariants required before a record may enter submission.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.title.trim().is_empty() {
            return Err(RecordError::MissingField("title"));
        }
        if self.company.trim().is_empty() {
            return Err(RecordError::MissingField("company"));
        }
        if self.html_content.trim().is_empty() {
            return Err(RecordError::MissingHtml);
        }
        Ok(())
    }

    /// Trims the key fields and normalizes dates to `DD/MM/YYYY` where possible.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.company = self.company.trim().to_string();
        self.created_at = normalize_date(self.created_at.trim());
        if let Deadline::On(raw) = &self.deadline {
            self.deadline = Deadline::On(normalize_date(raw));
        }
        self
    }
}
