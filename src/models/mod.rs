// src/models/mod.rs

pub mod ingredient;
pub mod pagination;
pub mod recipe;
pub mod tag;
pub mod user;
