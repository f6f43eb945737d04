use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    models::{
        pagination::{Paginated, page_bounds},
        user::{User, UserListParams, UserResponse},
    },
    utils::jwt::Claims,
};

pub(crate) async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, first_name, last_name, password, role, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Builds the externally visible profile for a viewer. The subscription flag
/// is false for an anonymous viewer and for the user themselves.
pub(crate) async fn user_response(
    pool: &SqlitePool,
    user: User,
    viewer: Option<i64>,
) -> Result<UserResponse, AppError> {
    let is_subscribed = match viewer {
        Some(viewer_id) if viewer_id != user.id => sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE subscriber_id = ? AND target_user_id = ?)",
        )
        .bind(viewer_id)
        .bind(user.id)
        .fetch_one(pool)
        .await?,
        _ => false,
    };

    Ok(UserResponse {
        email: user.email,
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed,
    })
}

/// List all users (paginated, public).
pub async fn list_users(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    viewer: Option<Extension<Claims>>,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse, AppError> {
    let viewer_id = viewer.map(|Extension(claims)| claims.user_id());
    let (page, limit) = page_bounds(params.page, params.limit, config.page_size);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, first_name, last_name, password, role, created_at
        FROM users
        ORDER BY id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(&pool)
    .await?;

    let mut results = Vec::with_capacity(users.len());
    for user in users {
        results.push(user_response(&pool, user, viewer_id).await?);
    }

    Ok(Json(Paginated::new(count, page, limit, results)))
}

/// Get a single user profile by ID.
pub async fn get_user(
    State(pool): State<SqlitePool>,
    viewer: Option<Extension<Claims>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let viewer_id = viewer.map(|Extension(claims)| claims.user_id());
    let user = fetch_user(&pool, id).await?;
    let response = user_response(&pool, user, viewer_id).await?;

    Ok(Json(response))
}
