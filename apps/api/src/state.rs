use std::sync::Arc;

use crate::config::Config;
use crate::scrape::ScraperRegistry;
use crate::submission::Submitter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub submitter: Submitter,
    pub scrapers: Arc<ScraperRegistry>,
}
