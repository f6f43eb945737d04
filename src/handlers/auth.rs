// src/handlers/auth.rs

use std::sync::LazyLock;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use regex::Regex;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    handlers::user::{fetch_user, user_response},
    models::user::{CreateUserRequest, LoginRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_.-]{1,20}$").unwrap());

/// Checks the username against the allowed pattern and the reserved value.
/// 'me' collides with the /api/users/me route and is never a valid username.
fn validate_username(username: &str) -> Result<(), AppError> {
    if username == "me" {
        return Err(AppError::Validation(
            "username".to_string(),
            "Username 'me' is reserved.".to_string(),
        ));
    }

    if !USERNAME_RE.is_match(username) {
        return Err(AppError::Validation(
            "username".to_string(),
            "Username must start with a letter and contain only letters, digits, '-', '_' and '.'."
                .to_string(),
        ));
    }

    Ok(())
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the profile (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    validate_username(&payload.username)?;

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, username, email, first_name, last_name, password, role, created_at
        "#,
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&hashed_password)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            let field = if e.to_string().contains("users.email") {
                "email"
            } else {
                "username"
            };
            AppError::Conflict(format!("A user with this {} already exists", field))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    let response = user_response(&pool, user, None).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the email and password against the database.
/// If valid, signs a JWT token with the user's ID and role.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, first_name, last_name, password, role, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::AuthError("User not found".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_jwt(
        user.id,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer"
    })))
}

/// Get the current user's profile.
pub async fn me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user(&pool, claims.user_id()).await?;
    let response = user_response(&pool, user, Some(claims.user_id())).await?;

    Ok(Json(response))
}
