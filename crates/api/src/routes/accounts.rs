//! Registration, login and profile endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use doc_store::DocumentStore;
use domain::{DomainError, Identity, Registration};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// -- Response types --

/// Response carrying a user's public fields. The password hash never appears.
#[derive(Serialize)]
pub struct UserResponse {
    pub message: &'static str,
    pub user: Identity,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: Identity,
}

// -- Handlers --

/// POST /register: create an account.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state
        .accounts
        .register(Registration {
            name: req.name,
            email: req.email,
            password: req.password,
            role: req.role,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User registered successfully",
            user: user.identity(),
        }),
    ))
}

/// POST /login: exchange credentials for a session token.
#[tracing::instrument(skip(state, req))]
pub async fn login<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.accounts.login(req.email, req.password).await?;
    let identity = user.identity();
    let token = state
        .sessions
        .issue(&identity)
        .map_err(DomainError::from)?;

    tracing::info!(user_id = %identity.id, "login successful");
    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        user: identity,
    }))
}

/// GET /profile: the identity carried by the caller's token.
pub async fn profile(Extension(identity): Extension<Identity>) -> Json<UserResponse> {
    Json(UserResponse {
        message: "User Profile",
        user: identity,
    })
}
