use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::extract_resource_id;

pub const DEFAULT_MODEL: &str = "gpt-4";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Base for artifact view URLs. Defaults to the endpoint.
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub default_model: String,
    pub port: u16,
    pub rust_log: String,
    pub options_path: PathBuf,
    pub cv_workspace: PathBuf,
    pub resume_text_dir: PathBuf,
    /// When set, every route except `/health` requires `Authorization: Bearer <token>`.
    pub submit_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3_endpoint = require_env("S3_ENDPOINT")?;
        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_public_url: optional_env("S3_PUBLIC_URL").unwrap_or_else(|| s3_endpoint.clone()),
            s3_endpoint,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            default_model: optional_env("DEFAULT_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            options_path: optional_env("OPTIONS_PATH")
                .unwrap_or_else(|| "./options.json".to_string())
                .into(),
            cv_workspace: optional_env("CV_WORKSPACE")
                .unwrap_or_else(|| "./LatexCV".to_string())
                .into(),
            resume_text_dir: optional_env("RESUME_TEXT_DIR")
                .unwrap_or_else(|| "./CVer".to_string())
                .into(),
            submit_token: optional_env("SUBMIT_TOKEN"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read options file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid options file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Option '{key}' is not a storage URL or identifier: '{value}'")]
    Unresolved { key: &'static str, value: String },

    #[error("Option 'trackingCollections' must name at least one collection")]
    NoCollections,
}

/// The options document: logical storage locations as bare identifiers or share URLs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    pub spreadsheet: String,
    pub cover_letters: String,
    pub job_postings_html: String,
    pub job_snapshots: String,
    pub cvs: String,
    pub old_content_files: String,
    /// Scanned in order for duplicates; the first receives new rows.
    #[serde(default = "default_collections")]
    pub tracking_collections: Vec<String>,
}

fn default_collections() -> Vec<String> {
    ["Planned", "Sent", "Rejected", "Not applied"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Folder identifiers copied into every JSON snapshot and tracking row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFields {
    pub old_content_files: String,
    pub job_postings_html: String,
    pub cover_letters: String,
    pub cvs: String,
}

impl SharedFields {
    /// Row order of the shared columns.
    pub fn values(&self) -> [&str; 4] {
        [
            &self.old_content_files,
            &self.job_postings_html,
            &self.cover_letters,
            &self.cvs,
        ]
    }
}

/// Options with every location resolved to a canonical identifier.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub spreadsheet_id: String,
    pub cover_letters_folder: String,
    pub html_folder: String,
    pub snapshots_folder: String,
    pub cv_folder: String,
    pub collections: Vec<String>,
    pub shared: SharedFields,
}

impl ResolvedOptions {
    pub fn primary_collection(&self) -> &str {
        // `resolve` guarantees at least one collection
        self.collections.first().map(String::as_str).unwrap_or_default()
    }
}

impl Options {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn resolve(self) -> Result<ResolvedOptions, ConfigError> {
        let collections: Vec<String> = self
            .tracking_collections
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if collections.is_empty() {
            return Err(ConfigError::NoCollections);
        }

        let old_content_files = resolve("oldContentFiles", &self.old_content_files)?;
        let job_postings_html = resolve("jobPostingsHtml", &self.job_postings_html)?;
        let cover_letters = resolve("coverLetters", &self.cover_letters)?;
        let cvs = resolve("cvs", &self.cvs)?;

        Ok(ResolvedOptions {
            spreadsheet_id: resolve("spreadsheet", &self.spreadsheet)?,
            cover_letters_folder: cover_letters.clone(),
            html_folder: job_postings_html.clone(),
            snapshots_folder: resolve("jobSnapshots", &self.job_snapshots)?,
            cv_folder: cvs.clone(),
            collections,
            shared: SharedFields {
                old_content_files,
                job_postings_html,
                cover_letters,
                cvs,
            },
        })
    }
}

fn resolve(key: &'static str, value: &str) -> Result<String, ConfigError> {
    extract_resource_id(value).ok_or_else(|| ConfigError::Unresolved {
        key,
        value: value.to_string(),
    })
}
