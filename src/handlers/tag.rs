use std::sync::LazyLock;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use regex::Regex;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::tag::{CreateTagRequest, Tag},
};

static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#[A-F0-9]{6}$").unwrap());
static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

fn strip_decor(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || c == '#')
}

/// List all tags (public, unpaginated).
pub async fn list_tags(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let tags = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags ORDER BY name")
        .fetch_all(&pool)
        .await?;

    Ok(Json(tags))
}

/// Get a single tag by ID.
pub async fn get_tag(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tag = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Tag not found".to_string()))?;

    Ok(Json(tag))
}

/// Create a new tag (admin only).
///
/// The color is normalized before validation: surrounding whitespace and '#'
/// are trimmed, the hex digits uppercased and the '#' prefix restored.
pub async fn create_tag(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let name = strip_decor(&payload.name).to_string();
    if name.is_empty() {
        return Err(AppError::Validation(
            "name".to_string(),
            "Name is required.".to_string(),
        ));
    }

    let color = format!("#{}", strip_decor(&payload.color).to_uppercase());
    if !COLOR_RE.is_match(&color) {
        return Err(AppError::Validation(
            "color".to_string(),
            "Color must be a hex value of the form #RRGGBB.".to_string(),
        ));
    }

    let slug = strip_decor(&payload.slug).to_string();
    if !SLUG_RE.is_match(&slug) {
        return Err(AppError::Validation(
            "slug".to_string(),
            "Slug may contain only letters, digits, hyphens and underscores.".to_string(),
        ));
    }

    let tag = sqlx::query_as::<_, Tag>(
        "INSERT INTO tags (name, color, slug) VALUES (?, ?, ?) RETURNING id, name, color, slug",
    )
    .bind(&name)
    .bind(&color)
    .bind(&slug)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("A tag with this name, color or slug already exists".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(tag)))
}
