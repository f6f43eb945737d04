use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    handlers::user::fetch_user,
    models::{
        pagination::{Paginated, page_bounds},
        recipe::ShortRecipeResponse,
        user::{SubscriptionParams, SubscriptionResponse, User},
    },
    utils::jwt::Claims,
};

/// Enriches a followed user's profile with their recipe count and a preview
/// of their recipes, capped by the optional recipes_limit parameter.
async fn subscription_profile(
    pool: &SqlitePool,
    user: User,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionResponse, AppError> {
    let recipes_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE author_id = ?")
            .bind(user.id)
            .fetch_one(pool)
            .await?;

    // LIMIT -1 means "no limit" in SQLite.
    let limit = recipes_limit.filter(|l| *l >= 0).unwrap_or(-1);
    let recipes = sqlx::query_as::<_, ShortRecipeResponse>(
        r#"
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = ?
        ORDER BY pub_date DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user.id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(SubscriptionResponse {
        email: user.email,
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed: true,
        recipes,
        recipes_count,
    })
}

/// Subscribe the current user to another user's recipe feed.
///
/// The target must exist; self-subscription and duplicates are rejected.
/// Returns the enriched target profile on success.
pub async fn subscribe(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Query(params): Query<SubscriptionParams>,
) -> Result<impl IntoResponse, AppError> {
    let subscriber_id = claims.user_id();
    let target = fetch_user(&pool, id).await?;

    if target.id == subscriber_id {
        return Err(AppError::BadRequest(
            "Cannot subscribe to yourself".to_string(),
        ));
    }

    sqlx::query("INSERT INTO subscriptions (subscriber_id, target_user_id) VALUES (?, ?)")
        .bind(subscriber_id)
        .bind(target.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::BadRequest("Already subscribed to this user".to_string())
            } else {
                AppError::from(e)
            }
        })?;

    let profile = subscription_profile(&pool, target, params.recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Unsubscribe the current user from another user.
pub async fn unsubscribe(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let target = fetch_user(&pool, id).await?;

    let result =
        sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = ? AND target_user_id = ?")
            .bind(claims.user_id())
            .bind(target.id)
            .execute(&pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Subscription not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// List the users the current user follows, enriched with recipe previews.
pub async fn list_subscriptions(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SubscriptionParams>,
) -> Result<impl IntoResponse, AppError> {
    let subscriber_id = claims.user_id();
    let (page, limit) = page_bounds(params.page, params.limit, config.page_size);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = ?")
            .bind(subscriber_id)
            .fetch_one(&pool)
            .await?;

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.password, u.role, u.created_at
        FROM users u
        JOIN subscriptions s ON s.target_user_id = u.id
        WHERE s.subscriber_id = ?
        ORDER BY u.id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(subscriber_id)
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(&pool)
    .await?;

    let mut results = Vec::with_capacity(users.len());
    for user in users {
        results.push(subscription_profile(&pool, user, params.recipes_limit).await?);
    }

    Ok(Json(Paginated::new(count, page, limit, results)))
}
