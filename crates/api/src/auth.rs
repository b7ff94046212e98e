//! Access gate: resolves the bearer token into an [`Identity`](domain::Identity).

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use domain::SessionIssuer;

use crate::error::ApiError;

/// Paths served without a token.
pub const PUBLIC_PATHS: [&str; 7] = [
    "/",
    "/register",
    "/login",
    "/all_products",
    "/products",
    "/health",
    "/metrics",
];

/// Rejects requests to non-public paths that lack a valid session token.
///
/// On success the verified [`Identity`](domain::Identity) is inserted into the request
/// extensions for handlers to extract.
pub async fn access_gate(
    State(sessions): State<Arc<SessionIssuer>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let identity = {
        let token = bearer_token(request.headers())?;
        sessions.verify(token).map_err(|err| {
            tracing::debug!(error = %err, "rejected session token");
            ApiError::InvalidToken
        })?
    };

    tracing::debug!(user_id = %identity.id, "request authenticated");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extracts the token from `Authorization: Bearer <token>` or a bare `<token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(ApiError::NoToken)?
        .to_str()
        .map_err(|_| ApiError::MalformedHeader)?
        .trim();
    if value.is_empty() {
        return Err(ApiError::NoToken);
    }

    match value.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest
            .split_whitespace()
            .next()
            .ok_or(ApiError::MalformedHeader),
        _ => Ok(value),
    }
}
