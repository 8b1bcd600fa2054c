//! Server-side scraping of captured job pages.
//!
//! Sites register a `Scraper` under their host name; pages from unregistered
//! hosts go to the fallback scraper, which reads schema.org `JobPosting`
//! JSON-LD and OpenGraph/meta tags.

pub mod handlers;
pub mod schema_org;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local};
use reqwest::Url;
use scraper::Html;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::JobRecord;

pub use schema_org::SchemaOrgScraper;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid page URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Page URL '{0}' has no host")]
    NoHost(String),

    #[error("Page HTML is empty")]
    EmptyPage,
}

/// A captured page: where it came from and its parsed document.
pub struct Page {
    pub url: Url,
    pub document: Html,
    raw: String,
}

impl Page {
    pub fn parse(url: &str, html: &str) -> Result<Self, ScrapeError> {
        let url = Url::parse(url.trim()).map_err(|e| ScrapeError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if html.trim().is_empty() {
            return Err(ScrapeError::EmptyPage);
        }
        Ok(Self {
            url,
            document: Html::parse_document(html),
            raw: html.to_string(),
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

pub trait Scraper: Send + Sync {
    /// Host this scraper handles, e.g. `finn.no`.
    fn site(&self) -> &str;

    fn scrape(&self, page: &Page) -> JobRecord;
}

/// `WWW.Finn.no` → `finn.no`
pub fn site_key(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Local capture time as `DD/MM/YYYY, HH:MM`.
pub fn captured_at(now: DateTime<Local>) -> String {
    now.format("%d/%m/%Y, %H:%M").to_string()
}

pub struct ScraperRegistry {
    scrapers: HashMap<String, Arc<dyn Scraper>>,
    fallback: Arc<dyn Scraper>,
}

impl Default for ScraperRegistry {
    fn default() -> Self {
        Self::new(Arc::new(SchemaOrgScraper))
    }
}

impl ScraperRegistry {
    pub fn new(fallback: Arc<dyn Scraper>) -> Self {
        Self {
            scrapers: HashMap::new(),
            fallback,
        }
    }

    /// Registers `scraper` for its site, replacing any earlier one.
    pub fn register(&mut self, scraper: Arc<dyn Scraper>) {
        let key = site_key(scraper.site());
        info!("Registered scraper for {key}");
        self.scrapers.insert(key, scraper);
    }

    pub fn resolve(&self, url: &Url) -> &dyn Scraper {
        url.host_str()
            .and_then(|host| self.scrapers.get(&site_key(host)))
            .unwrap_or(&self.fallback)
            .as_ref()
    }

    /// Scrapes `html` captured from `url` into a normalized record.
    pub fn scrape(&self, url: &str, html: &str, now: DateTime<Local>) -> Result<JobRecord, ScrapeError> {
        let page = Page::parse(url, html)?;
        if page.url.host_str().is_none() {
            return Err(ScrapeError::NoHost(url.to_string()));
        }

        let scraper = self.resolve(&page.url);
        debug!("Scraping {} with the {} scraper", page.url, scraper.site());

        let mut record = scraper.scrape(&page);
        if record.url.is_empty() {
            record.url = page.url.to_string();
        }
        record.html_content = page.raw().to_string();
        record.added_at = captured_at(now);
        Ok(record.normalized())
    }
}
