//! HTTP handlers for recipe endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{
    CostPreviewInput, CreateRecipeInput, FavoriteInput, Recipe, RecipeCostReport, RecipeDetail, UpdateRecipeInput,
};
use crate::services::RecipeService;
use crate::AppState;

/// Create a recipe and reserve its stock
pub async fn create_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateRecipeInput>,
) -> AppResult<(StatusCode, Json<RecipeDetail>)> {
    let service = RecipeService::new(state.db);
    let recipe = service.create(current_user.0.store_id, input).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// Get a recipe with its cost breakdown
pub async fn get_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<RecipeDetail>> {
    let service = RecipeService::new(state.db);
    let recipe = service.get(current_user.0.store_id, recipe_id).await?;
    Ok(Json(recipe))
}

/// List recipes, favorites first
pub async fn list_recipes(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Recipe>>> {
    let service = RecipeService::new(state.db);
    let recipes = service.list(current_user.0.store_id).await?;
    Ok(Json(recipes))
}

/// Update a recipe, replacing its composition when items are given
pub async fn update_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(recipe_id): Path<Uuid>,
    Json(input): Json<UpdateRecipeInput>,
) -> AppResult<Json<RecipeDetail>> {
    let service = RecipeService::new(state.db);
    let recipe = service
        .update(current_user.0.store_id, recipe_id, input)
        .await?;
    Ok(Json(recipe))
}

/// Delete a recipe and restore its stock
pub async fn delete_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = RecipeService::new(state.db);
    service.delete(current_user.0.store_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark or unmark a recipe as favorite
pub async fn set_favorite(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(recipe_id): Path<Uuid>,
    Json(input): Json<FavoriteInput>,
) -> AppResult<Json<Recipe>> {
    let service = RecipeService::new(state.db);
    let recipe = service
        .set_favorite(current_user.0.store_id, recipe_id, input.is_favorite)
        .await?;
    Ok(Json(recipe))
}

/// Calculate costs without saving anything
pub async fn calculate_costs(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CostPreviewInput>,
) -> AppResult<Json<RecipeCostReport>> {
    let service = RecipeService::new(state.db);
    let report = service
        .preview_costs(current_user.0.store_id, input)
        .await?;
    Ok(Json(report))
}
