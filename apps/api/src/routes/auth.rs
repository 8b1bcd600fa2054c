use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;

/// Bearer-token gate. A no-op unless `SUBMIT_TOKEN` is configured.
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.submit_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided != Some(expected) {
        debug!("Rejected request to {} without a valid token", request.uri().path());
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
