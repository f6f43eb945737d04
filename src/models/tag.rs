use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'tags' table in the database.
///
/// Color is a hex value ('#RRGGBB', uppercase); slug is restricted to
/// alphanumerics, hyphens and underscores. Both are normalized and checked on
/// write in the handler.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// DTO for creating a new tag (admin only).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 200, message = "Name length must be between 1 and 200 characters."))]
    pub name: String,

    #[validate(length(min = 1, max = 9, message = "Color length must be between 1 and 9 characters."))]
    pub color: String,

    #[validate(length(min = 1, max = 200, message = "Slug length must be between 1 and 200 characters."))]
    pub slug: String,
}
