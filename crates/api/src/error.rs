//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use doc_store::StoreError;
use domain::{AccountError, CartError, CatalogError, DomainError, OrderError, TokenError};
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
///
/// Every variant renders as `{"message": ..., "error": <kind>}`.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing input.
    BadRequest(String),
    /// No `Authorization` header was sent.
    NoToken,
    /// `Authorization` header was present but carried no token.
    MalformedHeader,
    /// The token failed verification.
    InvalidToken,
    /// The request ran past its deadline.
    Timeout,
    /// Domain logic error.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    error: &'static str,
}

impl ApiError {
    /// Returns the status code, error kind and client-facing message.
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "ValidationError", msg),
            ApiError::NoToken => (
                StatusCode::UNAUTHORIZED,
                "NoToken",
                "No token provided".to_string(),
            ),
            ApiError::MalformedHeader => (
                StatusCode::UNAUTHORIZED,
                "MalformedHeader",
                "Malformed authorization header".to_string(),
            ),
            ApiError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "InvalidToken",
                "Invalid or expired token".to_string(),
            ),
            ApiError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "Timeout",
                "Request timed out".to_string(),
            ),
            ApiError::Domain(err) => domain_error_parts(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();
        let body = ErrorBody {
            message,
            error: kind,
        };
        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "InternalError",
        "Internal server error".to_string(),
    )
}

fn domain_error_parts(err: DomainError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match &err {
        DomainError::Account(account_err) => match account_err {
            AccountError::MissingRegistrationFields
            | AccountError::MissingLoginFields
            | AccountError::InvalidRole(_) => (StatusCode::BAD_REQUEST, "ValidationError", message),
            AccountError::EmailTaken => (StatusCode::BAD_REQUEST, "Conflict", message),
            AccountError::UserNotFound | AccountError::InvalidPassword => {
                (StatusCode::UNAUTHORIZED, "Unauthorized", message)
            }
            AccountError::PasswordHash(_) => log_internal(&err),
        },
        DomainError::Catalog(CatalogError::NotSeller) => {
            (StatusCode::FORBIDDEN, "Forbidden", message)
        }
        DomainError::Catalog(_) => (StatusCode::BAD_REQUEST, "ValidationError", message),
        DomainError::Cart(CartError::ProductNotFound(_)) => {
            (StatusCode::NOT_FOUND, "ProductNotFound", message)
        }
        DomainError::Cart(_) => (StatusCode::BAD_REQUEST, "ValidationError", message),
        DomainError::Order(OrderError::EmptyCart) => {
            (StatusCode::BAD_REQUEST, "EmptyCart", message)
        }
        DomainError::Order(OrderError::TotalOverflow) => {
            (StatusCode::BAD_REQUEST, "ValidationError", message)
        }
        DomainError::Token(TokenError::Signing(_)) => log_internal(&err),
        DomainError::Token(_) => ApiError::InvalidToken.parts(),
        DomainError::Contention { .. } => (StatusCode::CONFLICT, "Contention", message),
        DomainError::Store(store_err) if store_err.is_conflict() => (
            StatusCode::CONFLICT,
            "Contention",
            "Concurrent update, please retry".to_string(),
        ),
        DomainError::Store(StoreError::DuplicateKey { .. }) => (
            StatusCode::CONFLICT,
            "Conflict",
            "Resource already exists".to_string(),
        ),
        DomainError::Store(StoreError::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            "NotFound",
            "Resource not found".to_string(),
        ),
        DomainError::Store(_) | DomainError::Serialization(_) => log_internal(&err),
    }
}

fn log_internal(err: &DomainError) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "internal server error");
    internal()
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_auth_failures_are_401_with_kind() {
        let (status, json) = render(ApiError::NoToken).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "NoToken");
        assert_eq!(json["message"], "No token provided");

        let (status, json) = render(DomainError::Token(TokenError::Expired).into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "InvalidToken");
    }

    #[tokio::test]
    async fn test_domain_errors_map_to_taxonomy() {
        let cases: Vec<(DomainError, StatusCode, &str)> = vec![
            (
                AccountError::EmailTaken.into(),
                StatusCode::BAD_REQUEST,
                "Conflict",
            ),
            (
                CatalogError::NotSeller.into(),
                StatusCode::FORBIDDEN,
                "Forbidden",
            ),
            (
                CartError::ProductNotFound(ProductId::new()).into(),
                StatusCode::NOT_FOUND,
                "ProductNotFound",
            ),
            (
                CartError::InvalidQuantity(0).into(),
                StatusCode::BAD_REQUEST,
                "ValidationError",
            ),
            (
                OrderError::EmptyCart.into(),
                StatusCode::BAD_REQUEST,
                "EmptyCart",
            ),
            (
                CartError::TotalOverflow.into(),
                StatusCode::BAD_REQUEST,
                "ValidationError",
            ),
            (
                OrderError::TotalOverflow.into(),
                StatusCode::BAD_REQUEST,
                "ValidationError",
            ),
            (
                AccountError::PasswordHash("corrupt hash".to_string()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
            ),
            (
                DomainError::Contention { attempts: 5 },
                StatusCode::CONFLICT,
                "Contention",
            ),
        ];

        for (err, expected_status, expected_kind) in cases {
            let (status, json) = render(err.into()).await;
            assert_eq!(status, expected_status);
            assert_eq!(json["error"], expected_kind);
        }
    }

    #[tokio::test]
    async fn test_internal_details_are_not_leaked() {
        let err = DomainError::Store(StoreError::InvalidBatch("secret detail".to_string()));
        let (status, json) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "InternalError");
        assert_eq!(json["message"], "Internal server error");
    }
}
