use axum::{
    extract::{Path, State},
    Json,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::errors::AppError;
use crate::models::{DedupKey, JobRecord};
use crate::state::AppState;
use crate::submission::pipeline::CvRebuild;
use crate::submission::Summary;

const BATCH_KEY: &str = "jobJSONObjects";

/// Either a single record or a batch under `jobJSONObjects`.
#[derive(Debug)]
pub enum SubmitBody {
    Batch { jobs: Vec<JobRecord> },
    Single(Box<JobRecord>),
}

// The batch key decides the shape, so a bad batch element surfaces its own
// parse error instead of falling through to an empty single record.
impl<'de> Deserialize<'de> for SubmitBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut body = serde_json::Value::deserialize(deserializer)?;
        let Some(batch) = body.as_object_mut().and_then(|o| o.remove(BATCH_KEY)) else {
            return serde_json::from_value(body)
                .map(|record| SubmitBody::Single(Box::new(record)))
                .map_err(D::Error::custom);
        };

        let items: Vec<serde_json::Value> =
            serde_json::from_value(batch).map_err(|e| D::Error::custom(format!("{BATCH_KEY}: {e}")))?;
        let jobs = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item)
                    .map_err(|e| D::Error::custom(format!("{BATCH_KEY}[{i}]: {e}")))
            })
            .collect::<Result<_, _>>()?;
        Ok(SubmitBody::Batch { jobs })
    }
}

#[derive(Debug, Serialize)]
pub struct FailedRecord {
    pub title: String,
    pub company: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub created: Vec<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<Vec<FailedRecord>>,
}

/// POST /submit-job
pub async fn handle_submit_job(
    State(state): State<AppState>,
    Json(body): Json<SubmitBody>,
) -> Result<Json<SubmitResponse>, AppError> {
    let jobs = match body {
        SubmitBody::Single(record) => {
            let summary = state.submitter.submit(*record).await?;
            return Ok(Json(SubmitResponse {
                success: true,
                created: vec![summary],
                failed: None,
            }));
        }
        SubmitBody::Batch { jobs } => jobs,
    };

    if jobs.is_empty() {
        return Err(AppError::Validation("No job objects to process".to_string()));
    }

    // Sequential, so rows land in body order
    let mut created = Vec::with_capacity(jobs.len());
    let mut failed = Vec::new();
    for record in jobs {
        let (title, company) = (record.title.clone(), record.company.clone());
        match state.submitter.submit(record).await {
            Ok(summary) => created.push(summary),
            Err(e) => {
                warn!("Skipping {title} @ {company}: {e}");
                failed.push(FailedRecord {
                    title,
                    company,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(Json(SubmitResponse {
        success: failed.is_empty(),
        created,
        failed: Some(failed),
    }))
}

/// POST /cv/rebuild
pub async fn handle_rebuild_cv(
    State(state): State<AppState>,
    Json(key): Json<DedupKey>,
) -> Result<Json<CvRebuild>, AppError> {
    Ok(Json(state.submitter.rebuild_cv(key).await?))
}

/// GET /jobs/:name
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(state.submitter.snapshot(&name).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_record_body() {
        let body: SubmitBody = serde_json::from_value(json!({
            "title": "Backend Engineer",
            "company": "Acme"
        }))
        .unwrap();
        assert!(matches!(body, SubmitBody::Single(r) if r.company == "Acme"));
    }

    #[test]
    fn test_batch_body() {
        let body: SubmitBody = serde_json::from_value(json!({
            "jobJSONObjects": [{"title": "A"}, {"title": "B"}]
        }))
        .unwrap();
        match body {
            SubmitBody::Batch { jobs } => assert_eq!(jobs.len(), 2),
            other => panic!("expected batch, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_batch_element_is_reported() {
        let err = serde_json::from_value::<SubmitBody>(json!({
            "jobJSONObjects": [{"title": "A"}, {"deadline": 5}]
        }))
        .unwrap_err()
        .to_string();
        assert!(err.contains("jobJSONObjects[1]"), "{err}");
        assert!(err.contains("invalid type"), "{err}");
    }

    #[test]
    fn test_batch_must_be_an_array() {
        let err = serde_json::from_value::<SubmitBody>(json!({"jobJSONObjects": {"title": "A"}}))
            .unwrap_err()
            .to_string();
        assert!(err.starts_with("jobJSONObjects:"), "{err}");
    }

    #[test]
    fn test_malformed_single_record_is_reported() {
        let err = serde_json::from_value::<SubmitBody>(json!({"title": ["A"]}))
            .unwrap_err()
            .to_string();
        assert!(err.contains("invalid type"), "{err}");
    }
}
