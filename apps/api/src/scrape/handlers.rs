use axum::{extract::State, Json};
use chrono::Local;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::JobRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    pub html: String,
}

/// POST /scrape
pub async fn handle_scrape(
    State(state): State<AppState>,
    Json(req): Json<ScrapeRequest>,
) -> Result<Json<JobRecord>, AppError> {
    let record = state.scrapers.scrape(&req.url, &req.html, Local::now())?;
    Ok(Json(record))
}
