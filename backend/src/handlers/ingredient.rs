//! HTTP handlers for ingredient catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{CreateIngredientInput, IngredientView, UpdateIngredientInput};
use crate::services::{IngredientService, IngredientUpdate};
use crate::AppState;

/// Create a new ingredient
pub async fn create_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateIngredientInput>,
) -> AppResult<(StatusCode, Json<IngredientView>)> {
    let service = IngredientService::new(state.db);
    let ingredient = service.create(current_user.0.store_id, input).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

/// Get an ingredient by ID
pub async fn get_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<IngredientView>> {
    let service = IngredientService::new(state.db);
    let ingredient = service.get(current_user.0.store_id, ingredient_id).await?;
    Ok(Json(ingredient))
}

/// List all ingredients of the store
pub async fn list_ingredients(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<IngredientView>>> {
    let service = IngredientService::new(state.db);
    let ingredients = service.list(current_user.0.store_id).await?;
    Ok(Json(ingredients))
}

/// Update an ingredient
pub async fn update_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
    Json(input): Json<UpdateIngredientInput>,
) -> AppResult<Json<IngredientUpdate>> {
    if input.touches_purchase() {
        tracing::info!("User {} editing purchase of ingredient {}", current_user.0.user_id, ingredient_id);
    }
    let service = IngredientService::new(state.db);
    let updated = service
        .update(current_user.0.store_id, ingredient_id, input)
        .await?;
    Ok(Json(updated))
}

/// Delete an ingredient
pub async fn delete_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    tracing::info!("User {} deleting ingredient {}", current_user.0.user_id, ingredient_id);
    let service = IngredientService::new(state.db);
    service.delete(current_user.0.store_id, ingredient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
