pub mod auth;
pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::scrape::handlers as scrape;
use crate::state::AppState;
use crate::submission::handlers as submission;

pub fn build_router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/submit-job", post(submission::handle_submit_job))
        .route("/cv/rebuild", post(submission::handle_rebuild_cv))
        .route("/jobs/:name", get(submission::handle_get_job))
        .route("/scrape", post(scrape::handle_scrape))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(guarded)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::testing::{sample_record, test_state};

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let fixture = test_state(Some("secret"));
        let (status, body) = send(
            build_router(fixture.state),
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "jobtrack");
    }

    #[tokio::test]
    async fn test_token_is_required_when_configured() {
        let fixture = test_state(Some("secret"));
        let record = serde_json::to_value(sample_record()).unwrap();

        let (status, body) = send(build_router(fixture.state.clone()), post_json("/submit-job", &record)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");

        let mut request = post_json("/submit-job", &record);
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, "Bearer secret".parse().unwrap());
        let (status, _) = send(build_router(fixture.state), request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_submit_then_duplicate() {
        let fixture = test_state(None);
        let record = serde_json::to_value(sample_record()).unwrap();

        let (status, body) = send(build_router(fixture.state.clone()), post_json("/submit-job", &record)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["created"][0]["sheetRow"], 2);
        assert!(body["created"][0]["jsonFile"]
            .as_str()
            .unwrap()
            .starts_with("Acme_Backend Engineer_"));

        let (status, body) = send(build_router(fixture.state), post_json("/submit-job", &record)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("already exists"));
        assert_eq!(fixture.records.row_count("Planned"), 1);
    }

    #[tokio::test]
    async fn test_batch_reports_partial_failure() {
        let fixture = test_state(None);
        let good = serde_json::to_value(sample_record()).unwrap();
        let mut missing_html = sample_record();
        missing_html.title = "Frontend Engineer".to_string();
        missing_html.html_content.clear();

        let body = json!({ "jobJSONObjects": [good, missing_html] });
        let (status, body) = send(build_router(fixture.state), post_json("/submit-job", &body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["created"].as_array().unwrap().len(), 1);
        assert_eq!(body["failed"][0]["title"], "Frontend Engineer");
        assert_eq!(
            body["failed"][0]["error"],
            "No HTML content provided in job.htmlContent"
        );
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let fixture = test_state(None);
        let (status, body) = send(
            build_router(fixture.state),
            post_json("/submit-job", &json!({ "jobJSONObjects": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No job objects to process");
    }

    #[tokio::test]
    async fn test_malformed_batch_element_is_unprocessable() {
        let fixture = test_state(None);
        let body = json!({"jobJSONObjects": [{"deadline": 5}]});
        let response = build_router(fixture.state)
            .oneshot(post_json("/submit-job", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("jobJSONObjects[0]"), "{text}");
        assert!(!text.contains("title"), "{text}");
        assert_eq!(fixture.records.row_count("Planned"), 0);
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_not_found() {
        let fixture = test_state(None);
        let (status, _) = send(
            build_router(fixture.state),
            Request::builder()
                .uri("/jobs/Nobody_Nothing_01_2025")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_scrape_returns_record() {
        let fixture = test_state(None);
        let body = json!({
            "url": "https://jobs.example.com/1",
            "html": "<html><head><meta property=\"og:title\" content=\"Welder\"></head></html>"
        });
        let (status, body) = send(build_router(fixture.state), post_json("/scrape", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Welder");
        assert_eq!(body["deadline"], Value::Null);
    }

    #[tokio::test]
    async fn test_scrape_rejects_invalid_url() {
        let fixture = test_state(None);
        let body = json!({ "url": "nope", "html": "<html></html>" });
        let (status, _) = send(build_router(fixture.state), post_json("/scrape", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
