//! Canonical artifact names: `{company}_{title}_{MM}_{YYYY}`.

use chrono::NaiveDate;

/// Characters not allowed in artifact names; each becomes `_`.
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if RESERVED.contains(&c) { '_' } else { c })
        .collect()
}

/// `MM_YYYY` of the submission date.
pub fn month_stamp(date: NaiveDate) -> String {
    date.format("%m_%Y").to_string()
}

/// Every filename derived from one canonical artifact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    base: String,
}

impl ArtifactNames {
    pub fn new(company: &str, title: &str, submitted_on: NaiveDate) -> Self {
        Self {
            base: format!(
                "{}_{}",
                sanitize(&format!("{company}_{title}")),
                month_stamp(submitted_on)
            ),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// The cover-letter document carries the bare name.
    pub fn document(&self) -> &str {
        &self.base
    }

    pub fn html(&self) -> String {
        format!("{}.html", self.base)
    }

    pub fn json(&self) -> String {
        format!("{}.json", self.base)
    }

    pub fn pdf(&self) -> String {
        format!("{}.pdf", self.base)
    }
}
