use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'ingredients' table in the database.
/// Uniqueness holds on the (name, measurement_unit) pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// DTO for creating a new ingredient (admin only).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateIngredientRequest {
    #[validate(length(min = 1, max = 200, message = "Name length must be between 1 and 200 characters."))]
    pub name: String,

    #[validate(length(min = 1, max = 200, message = "Measurement unit length must be between 1 and 200 characters."))]
    pub measurement_unit: String,
}

/// Query parameters for the ingredient list.
#[derive(Debug, Deserialize)]
pub struct IngredientListParams {
    /// Case-insensitive substring match on the ingredient name.
    pub name: Option<String>,
}
