//! HTTP handlers for the inventory ledger endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{InventorySnapshot, RestoreStockInput, UseStockInput};
use crate::services::InventoryService;
use crate::AppState;

/// Stock of every ingredient
pub async fn list_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventorySnapshot>>> {
    let service = InventoryService::new(state.db);
    let snapshots = service.list(current_user.0.store_id).await?;
    Ok(Json(snapshots))
}

/// Stock of one ingredient
pub async fn get_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<InventorySnapshot>> {
    let service = InventoryService::new(state.db);
    let snapshot = service.get(current_user.0.store_id, ingredient_id).await?;
    Ok(Json(snapshot))
}

/// Use stock directly
pub async fn use_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
    Json(input): Json<UseStockInput>,
) -> AppResult<Json<InventorySnapshot>> {
    tracing::info!(
        "User {} using {} of ingredient {}",
        current_user.0.user_id,
        input.used_stock,
        ingredient_id
    );
    let service = InventoryService::new(state.db);
    let snapshot = service
        .use_direct(current_user.0.store_id, ingredient_id, input.used_stock)
        .await?;
    Ok(Json(snapshot))
}

/// Put stock back directly
pub async fn restore_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
    Json(input): Json<RestoreStockInput>,
) -> AppResult<Json<InventorySnapshot>> {
    tracing::info!(
        "User {} restoring {} of ingredient {}",
        current_user.0.user_id,
        input.amount,
        ingredient_id
    );
    let service = InventoryService::new(state.db);
    let snapshot = service
        .restore(current_user.0.store_id, ingredient_id, input.amount)
        .await?;
    Ok(Json(snapshot))
}
