use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{tag::Tag, user::UserResponse};

/// Represents the 'recipes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    pub name: String,

    /// Base64-encoded image payload, stored as-is.
    pub image: String,

    pub text: String,

    /// Cooking time in minutes (1..=1440).
    pub cooking_time: i64,

    /// Publish timestamp, set once on insert.
    pub pub_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// One composition row as exposed in the read representation:
/// the ingredient joined with its per-recipe amount.
#[derive(Debug, Serialize, FromRow)]
pub struct RecipeIngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Full externally visible recipe representation.
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

/// Short projection returned by the favorite/cart endpoints and used for
/// recipe previews in subscription profiles.
#[derive(Debug, Serialize, FromRow)]
pub struct ShortRecipeResponse {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

/// One (ingredient id, amount) entry of a create/update payload.
#[derive(Debug, Deserialize, Validate)]
pub struct RecipeIngredientInput {
    pub id: i64,

    #[validate(range(min = 1, max = 1000, message = "Amount must be between 1 and 1000."))]
    pub amount: i64,
}

/// DTO for creating a new recipe. The author always comes from the
/// authenticated identity, never from the payload.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecipeRequest {
    #[validate(length(min = 1, max = 200, message = "Name length must be between 1 and 200 characters."))]
    pub name: String,

    #[validate(length(min = 1, message = "Text is required."))]
    pub text: String,

    pub image: String,

    #[validate(range(min = 1, max = 1440, message = "Cooking time must be between 1 and 1440 minutes."))]
    pub cooking_time: i64,

    pub tags: Vec<i64>,

    #[validate(nested)]
    pub ingredients: Vec<RecipeIngredientInput>,
}

/// DTO for partially updating a recipe. Supplied tag/ingredient lists replace
/// the association sets wholesale.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRecipeRequest {
    #[validate(length(min = 1, max = 200, message = "Name length must be between 1 and 200 characters."))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "Text is required."))]
    pub text: Option<String>,

    pub image: Option<String>,

    #[validate(range(min = 1, max = 1440, message = "Cooking time must be between 1 and 1440 minutes."))]
    pub cooking_time: Option<i64>,

    pub tags: Option<Vec<i64>>,

    #[validate(nested)]
    pub ingredients: Option<Vec<RecipeIngredientInput>>,
}

/// Query parameters for the recipe list.
#[derive(Debug, Deserialize)]
pub struct RecipeListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,

    /// Comma-separated tag slugs; OR semantics within the dimension.
    pub tags: Option<String>,

    /// Author user id.
    pub author: Option<i64>,

    /// Viewer-relative flags; non-zero values activate the filter.
    /// No-ops for an anonymous viewer.
    pub is_favorited: Option<i64>,
    pub is_in_shopping_cart: Option<i64>,
}
