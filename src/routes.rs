// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, ingredient, interaction, recipe, subscription, tag, user},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, optional_auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, users, catalog, recipes).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new().route("/login", post(auth::login));

    // Public user routes; a valid token still flavors is_subscribed.
    let user_routes = Router::new()
        .route("/", post(auth::register).get(user::list_users))
        .route("/{id}", get(user::get_user))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let protected_user_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/subscriptions", get(subscription::list_subscriptions))
        .route(
            "/{id}/subscribe",
            post(subscription::subscribe).delete(subscription::unsubscribe),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let catalog_routes = Router::new()
        .route("/tags", get(tag::list_tags))
        .route("/tags/{id}", get(tag::get_tag))
        .route("/ingredients", get(ingredient::list_ingredients))
        .route("/ingredients/{id}", get(ingredient::get_ingredient));

    // Catalog writes: Auth first, then Admin check.
    let admin_catalog_routes = Router::new()
        .route("/tags", post(tag::create_tag))
        .route("/ingredients", post(ingredient::create_ingredient))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let recipe_read_routes = Router::new()
        .route("/", get(recipe::list_recipes))
        .route("/{id}", get(recipe::get_recipe))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let recipe_write_routes = Router::new()
        .route("/", post(recipe::create_recipe))
        .route(
            "/{id}",
            patch(recipe::update_recipe).delete(recipe::delete_recipe),
        )
        .route(
            "/{id}/favorite",
            post(interaction::add_favorite).delete(interaction::remove_favorite),
        )
        .route(
            "/{id}/shopping_cart",
            post(interaction::add_to_cart).delete(interaction::remove_from_cart),
        )
        .route(
            "/download_shopping_cart",
            get(interaction::download_shopping_cart),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes.merge(protected_user_routes))
        .nest("/api", catalog_routes.merge(admin_catalog_routes))
        .nest("/api/recipes", recipe_read_routes.merge(recipe_write_routes))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
