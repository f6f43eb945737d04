// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::recipe::ShortRecipeResponse;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Unique email address. Login identifier.
    pub email: String,

    pub first_name: String,
    pub last_name: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Externally visible profile, with the viewer-relative subscription flag.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

/// Profile enriched with the user's recipes, returned by the
/// subscription endpoints.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<ShortRecipeResponse>,
    pub recipes_count: i64,
}

/// DTO for creating a new user (Registration).
/// The username pattern and the reserved value 'me' are checked in the handler.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 2,
        max = 21,
        message = "Username length must be between 2 and 21 characters."
    ))]
    pub username: String,

    #[validate(email(message = "Invalid email address."))]
    #[validate(length(max = 254, message = "Email must be at most 254 characters."))]
    pub email: String,

    #[validate(length(min = 1, max = 150, message = "First name is required."))]
    pub first_name: String,

    #[validate(length(min = 1, max = 150, message = "Last name is required."))]
    pub last_name: String,

    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Query parameters for the user list.
#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Query parameters for the subscription endpoints.
#[derive(Debug, Deserialize)]
pub struct SubscriptionParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Caps the recipe preview list of each followed user.
    pub recipes_limit: Option<i64>,
}
