use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::ingredient::{CreateIngredientRequest, Ingredient, IngredientListParams},
};

/// List ingredients (public, unpaginated).
/// Supports a case-insensitive substring filter on the name.
pub async fn list_ingredients(
    State(pool): State<SqlitePool>,
    Query(params): Query<IngredientListParams>,
) -> Result<impl IntoResponse, AppError> {
    let ingredients = match params.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => {
            sqlx::query_as::<_, Ingredient>(
                r#"
                SELECT id, name, measurement_unit
                FROM ingredients
                WHERE LOWER(name) LIKE '%' || LOWER(?) || '%'
                ORDER BY name
                "#,
            )
            .bind(name)
            .fetch_all(&pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Ingredient>(
                "SELECT id, name, measurement_unit FROM ingredients ORDER BY name",
            )
            .fetch_all(&pool)
            .await?
        }
    };

    Ok(Json(ingredients))
}

/// Get a single ingredient by ID.
pub async fn get_ingredient(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Ingredient not found".to_string()))?;

    Ok(Json(ingredient))
}

/// Create a new ingredient (admin only).
/// Uniqueness holds on the (name, measurement_unit) pair.
pub async fn create_ingredient(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateIngredientRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let ingredient = sqlx::query_as::<_, Ingredient>(
        r#"
        INSERT INTO ingredients (name, measurement_unit)
        VALUES (?, ?)
        RETURNING id, name, measurement_unit
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.measurement_unit.trim())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("This ingredient already exists".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(ingredient)))
}
