use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use sqlx::{FromRow, SqlitePool};

use crate::{
    error::{AppError, is_unique_violation},
    models::recipe::ShortRecipeResponse,
    utils::jwt::Claims,
};

async fn fetch_short_recipe(
    pool: &SqlitePool,
    id: i64,
) -> Result<ShortRecipeResponse, AppError> {
    sqlx::query_as::<_, ShortRecipeResponse>(
        "SELECT id, name, image, cooking_time FROM recipes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Recipe not found".to_string()))
}

/// Inserts a (user, recipe) relation row. The store's unique index decides
/// races: the loser gets the "already present" error, never a duplicate row.
async fn add_relation(
    pool: &SqlitePool,
    table: &str,
    conflict_msg: &str,
    user_id: i64,
    recipe_id: i64,
) -> Result<(StatusCode, Json<ShortRecipeResponse>), AppError> {
    let recipe = fetch_short_recipe(pool, recipe_id).await?;

    let sql = format!("INSERT INTO {table} (user_id, recipe_id) VALUES (?, ?)");
    sqlx::query(&sql)
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::BadRequest(conflict_msg.to_string())
            } else {
                AppError::from(e)
            }
        })?;

    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn remove_relation(
    pool: &SqlitePool,
    table: &str,
    missing_msg: &str,
    user_id: i64,
    recipe_id: i64,
) -> Result<StatusCode, AppError> {
    let sql = format!("DELETE FROM {table} WHERE user_id = ? AND recipe_id = ?");
    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest(missing_msg.to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Add a recipe to the current user's favorites.
pub async fn add_favorite(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(recipe_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    add_relation(
        &pool,
        "favorites",
        "Recipe is already in favorites",
        claims.user_id(),
        recipe_id,
    )
    .await
}

/// Remove a recipe from the current user's favorites.
pub async fn remove_favorite(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(recipe_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    remove_relation(
        &pool,
        "favorites",
        "Recipe is not in favorites",
        claims.user_id(),
        recipe_id,
    )
    .await
}

/// Add a recipe to the current user's shopping cart.
pub async fn add_to_cart(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(recipe_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    add_relation(
        &pool,
        "shopping_cart",
        "Recipe is already in the shopping cart",
        claims.user_id(),
        recipe_id,
    )
    .await
}

/// Remove a recipe from the current user's shopping cart.
pub async fn remove_from_cart(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(recipe_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    remove_relation(
        &pool,
        "shopping_cart",
        "Recipe is not in the shopping cart",
        claims.user_id(),
        recipe_id,
    )
    .await
}

#[derive(Debug, FromRow)]
struct ShoppingListItem {
    name: String,
    measurement_unit: String,
    total: i64,
}

fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    let mut out = String::from("Shopping list\n\n");
    for item in items {
        out.push_str(&format!(
            "{} ({}) - {}\n",
            item.name, item.measurement_unit, item.total
        ));
    }
    out.push_str("\nFoodgram\n");
    out
}

/// Download the aggregated shopping list for the current user's cart.
///
/// One grouped-sum query: cart recipes joined to their composition rows,
/// grouped by (ingredient name, unit), amounts summed, ordered by name.
pub async fn download_shopping_cart(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let items = sqlx::query_as::<_, ShoppingListItem>(
        r#"
        SELECT i.name, i.measurement_unit, SUM(ri.amount) AS total
        FROM shopping_cart sc
        JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = ?
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    let body = render_shopping_list(&items);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"shopping_list.txt\"",
            ),
        ],
        body,
    ))
}
