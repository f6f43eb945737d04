use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::user::{fetch_user, user_response},
    models::{
        pagination::{Paginated, page_bounds},
        recipe::{
            CreateRecipeRequest, Recipe, RecipeIngredientInput, RecipeIngredientResponse,
            RecipeListParams, RecipeResponse, UpdateRecipeRequest,
        },
        tag::Tag,
    },
    utils::{html::clean_html, jwt::Claims},
};

pub(crate) async fn fetch_recipe(pool: &SqlitePool, id: i64) -> Result<Recipe, AppError> {
    sqlx::query_as::<_, Recipe>(
        "SELECT id, author_id, name, image, text, cooking_time, pub_date FROM recipes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Recipe not found".to_string()))
}

async fn relation_exists(
    pool: &SqlitePool,
    table: &str,
    user_id: i64,
    recipe_id: i64,
) -> Result<bool, AppError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE user_id = ? AND recipe_id = ?)");

    Ok(sqlx::query_scalar::<_, bool>(&sql)
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(pool)
        .await?)
}

/// Composes the full externally visible recipe representation: tags, author,
/// ingredients with amounts, and the viewer-relative flags. Both flags are
/// false for an anonymous viewer.
pub(crate) async fn build_recipe_response(
    pool: &SqlitePool,
    recipe: Recipe,
    viewer: Option<i64>,
) -> Result<RecipeResponse, AppError> {
    let tags = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name, t.color, t.slug
        FROM tags t
        JOIN recipe_tags rt ON rt.tag_id = t.id
        WHERE rt.recipe_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(recipe.id)
    .fetch_all(pool)
    .await?;

    let ingredients = sqlx::query_as::<_, RecipeIngredientResponse>(
        r#"
        SELECT i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ?
        ORDER BY i.name
        "#,
    )
    .bind(recipe.id)
    .fetch_all(pool)
    .await?;

    let author_row = fetch_user(pool, recipe.author_id).await?;
    let author = user_response(pool, author_row, viewer).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(user_id) => (
            relation_exists(pool, "favorites", user_id, recipe.id).await?,
            relation_exists(pool, "shopping_cart", user_id, recipe.id).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeResponse {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

fn check_distinct(field: &str, ids: &[i64]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(*id) {
            return Err(AppError::Validation(
                field.to_string(),
                format!("Duplicate {} are not allowed.", field),
            ));
        }
    }
    Ok(())
}

async fn ensure_ids_exist(
    pool: &SqlitePool,
    table: &str,
    field: &str,
    ids: &[i64],
) -> Result<(), AppError> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT id FROM {table} WHERE id IN ("));
    {
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
    }
    qb.push(")");

    let found: Vec<i64> = qb.build_query_scalar().fetch_all(pool).await?;

    for id in ids {
        if !found.contains(id) {
            return Err(AppError::Validation(
                field.to_string(),
                format!("Unknown {} id {}.", field.trim_end_matches('s'), id),
            ));
        }
    }

    Ok(())
}

/// Validates a supplied tag id list: non-empty, distinct, all known.
async fn validate_tag_list(pool: &SqlitePool, tags: &[i64]) -> Result<(), AppError> {
    if tags.is_empty() {
        return Err(AppError::Validation(
            "tags".to_string(),
            "At least one tag is required.".to_string(),
        ));
    }
    check_distinct("tags", tags)?;
    ensure_ids_exist(pool, "tags", "tags", tags).await
}

/// Validates a supplied ingredient list: non-empty, distinct ids, all known.
async fn validate_ingredient_list(
    pool: &SqlitePool,
    ingredients: &[RecipeIngredientInput],
) -> Result<(), AppError> {
    if ingredients.is_empty() {
        return Err(AppError::Validation(
            "ingredients".to_string(),
            "At least one ingredient is required.".to_string(),
        ));
    }
    let ids: Vec<i64> = ingredients.iter().map(|i| i.id).collect();
    check_distinct("ingredients", &ids)?;
    ensure_ids_exist(pool, "ingredients", "ingredients", &ids).await
}

async fn insert_tag_links(
    tx: &mut Transaction<'_, Sqlite>,
    recipe_id: i64,
    tags: &[i64],
) -> Result<(), AppError> {
    let mut qb = QueryBuilder::<Sqlite>::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    qb.push_values(tags, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    qb.build().execute(&mut **tx).await?;

    Ok(())
}

async fn insert_compositions(
    tx: &mut Transaction<'_, Sqlite>,
    recipe_id: i64,
    ingredients: &[RecipeIngredientInput],
) -> Result<(), AppError> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
    );
    qb.push_values(ingredients, |mut row, ingredient| {
        row.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });
    qb.build().execute(&mut **tx).await?;

    Ok(())
}

/// Appends the WHERE clauses for the recipe list filters. The viewer-relative
/// filters (is_favorited, is_in_shopping_cart) are no-ops for an anonymous
/// viewer and for zero values.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, params: &RecipeListParams, viewer: Option<i64>) {
    if let Some(tags) = params.tags.as_deref() {
        let slugs: Vec<String> = tags
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if !slugs.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug IN (",
            );
            {
                let mut separated = qb.separated(", ");
                for slug in slugs {
                    separated.push_bind(slug);
                }
            }
            qb.push("))");
        }
    }

    if let Some(author) = params.author {
        qb.push(" AND r.author_id = ");
        qb.push_bind(author);
    }

    if let Some(user_id) = viewer {
        if params.is_favorited.unwrap_or(0) != 0 {
            qb.push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ");
            qb.push_bind(user_id);
            qb.push(")");
        }
        if params.is_in_shopping_cart.unwrap_or(0) != 0 {
            qb.push(" AND EXISTS (SELECT 1 FROM shopping_cart sc WHERE sc.recipe_id = r.id AND sc.user_id = ");
            qb.push_bind(user_id);
            qb.push(")");
        }
    }
}

/// List recipes (paginated, newest first), filterable by tag slugs, author
/// and the viewer-relative flags.
pub async fn list_recipes(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    viewer: Option<Extension<Claims>>,
    Query(params): Query<RecipeListParams>,
) -> Result<impl IntoResponse, AppError> {
    let viewer_id = viewer.map(|Extension(claims)| claims.user_id());
    let (page, limit) = page_bounds(params.page, params.limit, config.page_size);

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes r WHERE 1 = 1");
    push_filters(&mut count_qb, &params, viewer_id);
    let count: i64 = count_qb.build_query_scalar().fetch_one(&pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date \
         FROM recipes r WHERE 1 = 1",
    );
    push_filters(&mut qb, &params, viewer_id);
    qb.push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind((page - 1) * limit);

    let recipes: Vec<Recipe> = qb.build_query_as().fetch_all(&pool).await?;

    let mut results = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        results.push(build_recipe_response(&pool, recipe, viewer_id).await?);
    }

    Ok(Json(Paginated::new(count, page, limit, results)))
}

/// Get a single recipe by ID.
pub async fn get_recipe(
    State(pool): State<SqlitePool>,
    viewer: Option<Extension<Claims>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let viewer_id = viewer.map(|Extension(claims)| claims.user_id());
    let recipe = fetch_recipe(&pool, id).await?;
    let response = build_recipe_response(&pool, recipe, viewer_id).await?;

    Ok(Json(response))
}

/// Create a new recipe. The author comes from the authenticated identity.
///
/// The recipe row, its tag links and its composition rows are written inside
/// one transaction so a failure leaves no partial state behind.
pub async fn create_recipe(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    validate_tag_list(&pool, &payload.tags).await?;
    validate_ingredient_list(&pool, &payload.ingredients).await?;
    if payload.image.trim().is_empty() {
        return Err(AppError::Validation(
            "image".to_string(),
            "Image is required.".to_string(),
        ));
    }

    let author_id = claims.user_id();
    let text = clean_html(&payload.text);

    let mut tx = pool.begin().await?;

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time, pub_date)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, author_id, name, image, text, cooking_time, pub_date
        "#,
    )
    .bind(author_id)
    .bind(&payload.name)
    .bind(&payload.image)
    .bind(&text)
    .bind(payload.cooking_time)
    .bind(chrono::Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    insert_tag_links(&mut tx, recipe.id, &payload.tags).await?;
    insert_compositions(&mut tx, recipe.id, &payload.ingredients).await?;

    tx.commit().await?;

    let response = build_recipe_response(&pool, recipe, Some(author_id)).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Partially update a recipe (author or admin only).
///
/// Supplied tag/ingredient lists replace the association sets wholesale:
/// existing rows are deleted and the new set bulk-inserted within the same
/// transaction, so readers never observe a half-replaced composition.
pub async fn update_recipe(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let recipe = fetch_recipe(&pool, id).await?;
    if recipe.author_id != claims.user_id() && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You are not allowed to edit this recipe".to_string(),
        ));
    }

    if let Some(tags) = &payload.tags {
        validate_tag_list(&pool, tags).await?;
    }
    if let Some(ingredients) = &payload.ingredients {
        validate_ingredient_list(&pool, ingredients).await?;
    }
    if let Some(image) = &payload.image
        && image.trim().is_empty()
    {
        return Err(AppError::Validation(
            "image".to_string(),
            "Image is required.".to_string(),
        ));
    }

    let name = payload.name.unwrap_or(recipe.name);
    let image = payload.image.unwrap_or(recipe.image);
    let text = payload
        .text
        .map(|t| clean_html(&t))
        .unwrap_or(recipe.text);
    let cooking_time = payload.cooking_time.unwrap_or(recipe.cooking_time);

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE recipes SET name = ?, image = ?, text = ?, cooking_time = ? WHERE id = ?")
        .bind(&name)
        .bind(&image)
        .bind(&text)
        .bind(cooking_time)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if let Some(tags) = &payload.tags {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_tag_links(&mut tx, id, tags).await?;
    }

    if let Some(ingredients) = &payload.ingredients {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_compositions(&mut tx, id, ingredients).await?;
    }

    tx.commit().await?;

    let updated = fetch_recipe(&pool, id).await?;
    let response = build_recipe_response(&pool, updated, Some(claims.user_id())).await?;

    Ok(Json(response))
}

/// Delete a recipe (author or admin only).
/// Favorites, cart entries and composition rows go with it via cascades.
pub async fn delete_recipe(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = fetch_recipe(&pool, id).await?;

    if recipe.author_id != claims.user_id() && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You are not allowed to delete this recipe".to_string(),
        ));
    }

    sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
