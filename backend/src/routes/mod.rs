//! Route definitions for the Livflow back-office

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - ingredient catalog
        .nest("/ingredients", ingredient_routes(state.clone()))
        // Protected routes - recipes and costing
        .nest("/recipes", recipe_routes(state.clone()))
        // Protected routes - inventory ledger
        .nest("/inventory", inventory_routes(state))
}

/// Ingredient catalog routes (protected)
fn ingredient_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_ingredients).post(handlers::create_ingredient),
        )
        .route(
            "/:ingredient_id",
            get(handlers::get_ingredient)
                .put(handlers::update_ingredient)
                .delete(handlers::delete_ingredient),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Recipe routes (protected)
fn recipe_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_recipes).post(handlers::create_recipe))
        .route("/calculate", post(handlers::calculate_costs))
        .route(
            "/:recipe_id",
            get(handlers::get_recipe)
                .put(handlers::update_recipe)
                .delete(handlers::delete_recipe),
        )
        .route("/:recipe_id/favorite", put(handlers::set_favorite))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Inventory ledger routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_inventory))
        .route("/:ingredient_id", get(handlers::get_inventory))
        .route("/:ingredient_id/use", post(handlers::use_stock))
        .route("/:ingredient_id/restore", post(handlers::restore_stock))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
