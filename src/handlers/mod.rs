// src/handlers/mod.rs

pub mod auth;
pub mod ingredient;
pub mod interaction;
pub mod recipe;
pub mod subscription;
pub mod tag;
pub mod user;
