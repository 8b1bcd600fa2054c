use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::generation::GenerationError;
use crate::scrape::ScrapeError;
use crate::storage::StoreError;
use crate::submission::SubmitError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    MissingPrerequisite(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Duplicate(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MissingPrerequisite(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                StatusCode::BAD_GATEWAY
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                StatusCode::BAD_GATEWAY
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => AppError::NotFound(e.to_string()),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<GenerationError> for AppError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::MissingPrerequisite(_) => AppError::MissingPrerequisite(e.to_string()),
            GenerationError::Llm(_) | GenerationError::MissingBlock(_) => {
                AppError::Llm(e.to_string())
            }
            GenerationError::Storage(store) => store.into(),
            GenerationError::Compile(_) | GenerationError::Io { .. } => {
                AppError::Internal(anyhow::Error::new(e))
            }
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Duplicate(_) => AppError::Duplicate(e.to_string()),
            SubmitError::Invalid(_) => AppError::Validation(e.to_string()),
            SubmitError::Storage(store) => store.into(),
            SubmitError::Generation(generation) => generation.into(),
            SubmitError::SnapshotMissing(_) => AppError::NotFound(e.to_string()),
            SubmitError::SnapshotAmbiguous(_) => AppError::Conflict(e.to_string()),
            SubmitError::Snapshot(_) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<ScrapeError> for AppError {
    fn from(e: ScrapeError) -> Self {
        AppError::Validation(e.to_string())
    }
}
