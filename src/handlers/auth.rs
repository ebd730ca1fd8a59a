// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, User, UserProfile},
    store::Store,
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the public profile (no password, no analytics).
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Invalid username or weak password"),
        (status = 409, description = "Username taken")
    ),
    tag = "auth"
)]
pub async fn register(
    State(store): State<Arc<dyn Store>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = store
        .create_user(User::new(payload.username.trim(), hashed_password))
        .await
        .map_err(|e| {
            tracing::warn!("Failed to register user: {}", e);
            AppError::from(e)
        })?;

    tracing::info!(username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// Authenticates a user and returns a JWT token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued"),
        (status = 401, description = "Unknown user or wrong password")
    ),
    tag = "auth"
)]
pub async fn login(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = store
        .get_user(payload.username.trim())
        .await?
        .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let token = sign_jwt(&user.username, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "username": user.username
    })))
}
