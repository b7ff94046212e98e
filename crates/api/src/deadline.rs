//! Uniform request deadline.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;

/// Fails the request with `Timeout` if the inner service does not answer in time.
pub async fn enforce_deadline(
    State(deadline): State<Duration>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_owned();
    tokio::time::timeout(deadline, next.run(request))
        .await
        .map_err(|_| {
            tracing::warn!(%path, ?deadline, "request deadline exceeded");
            ApiError::Timeout
        })
}
