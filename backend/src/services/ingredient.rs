//! Ingredient catalog service
//!
//! Purchase edits reconcile the inventory balance and refresh the cached
//! costs of every recipe using the ingredient, in one transaction.

use serde::Serialize;
use shared::{
    reconcile, validate_name, validate_new_ingredient, validate_purchase_price, validate_purchase_quantity,
    validate_vendor, CreateIngredientInput, Ingredient, IngredientView, PurchaseEdit, Reconciliation,
    UpdateIngredientInput,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{inventory, recipe::refresh_recipe_costs};
use crate::error::{AppError, AppResult};
use crate::repository::{PgRepository, Repository, RepositoryTx};

/// Ingredient service
#[derive(Clone)]
pub struct IngredientService<R = PgRepository> {
    repo: R,
}

/// Result of an ingredient update
#[derive(Debug, Clone, Serialize)]
pub struct IngredientUpdate {
    #[serde(flatten)]
    pub ingredient: IngredientView,
    /// Present when the purchase quantity changed and stock was re-derived
    pub stock_reconciliation: Option<Reconciliation>,
}

impl IngredientService {
    pub fn new(db: PgPool) -> Self {
        Self {
            repo: PgRepository::new(db),
        }
    }
}

impl<R: Repository> IngredientService<R> {
    pub fn with_repository(repo: R) -> Self {
        Self { repo }
    }

    /// Create an ingredient and seed its inventory at the purchase quantity
    pub async fn create(&self, store_id: Uuid, input: CreateIngredientInput) -> AppResult<IngredientView> {
        validate_new_ingredient(&input)
            .map_err(|(field, message)| AppError::validation(field, message, "재료 정보를 확인하세요."))?;

        let mut ingredient = Ingredient::new(
            store_id,
            input.name.trim(),
            input.purchase_price,
            input.purchase_quantity,
            input.unit,
        );
        ingredient.vendor = input.vendor;
        ingredient.notes = input.notes;

        let mut tx = self.repo.begin().await?;
        tx.insert_ingredient(&ingredient).await?;
        inventory::get_or_create(&mut tx, &ingredient).await?;
        tx.commit().await?;

        tracing::info!("Created ingredient {} ({})", ingredient.id, ingredient.name);
        Ok(ingredient.into())
    }

    pub async fn get(&self, store_id: Uuid, ingredient_id: Uuid) -> AppResult<IngredientView> {
        let mut tx = self.repo.begin().await?;
        let ingredient = find_ingredient(&mut tx, store_id, ingredient_id).await?;
        tx.commit().await?;
        Ok(ingredient.into())
    }

    pub async fn list(&self, store_id: Uuid) -> AppResult<Vec<IngredientView>> {
        let mut tx = self.repo.begin().await?;
        let ingredients = tx.list_ingredients(store_id).await?;
        tx.commit().await?;
        Ok(ingredients.into_iter().map(Into::into).collect())
    }

    /// Apply a partial update; purchase edits reconcile the stock balance
    pub async fn update(
        &self,
        store_id: Uuid,
        ingredient_id: Uuid,
        input: UpdateIngredientInput,
    ) -> AppResult<IngredientUpdate> {
        if let Some(name) = &input.name {
            validate_name(name).map_err(|e| AppError::validation("name", e, "재료 이름을 입력하세요."))?;
        }
        if let Some(price) = input.purchase_price {
            validate_purchase_price(price)
                .map_err(|e| AppError::validation("purchase_price", e, "구매 가격을 확인하세요."))?;
        }
        if let Some(quantity) = input.purchase_quantity {
            validate_purchase_quantity(quantity)
                .map_err(|e| AppError::validation("purchase_quantity", e, "구매 수량을 확인하세요."))?;
        }
        validate_vendor(input.vendor.as_deref())
            .map_err(|e| AppError::validation("vendor", e, "구매처 이름이 너무 깁니다."))?;

        let mut tx = self.repo.begin().await?;
        let mut ingredient = lock_ingredient(&mut tx, store_id, ingredient_id).await?;
        let using_recipes = tx.recipe_ids_using_ingredient(ingredient.id).await?;

        if let Some(unit) = input.unit {
            if unit != ingredient.unit && !using_recipes.is_empty() {
                return Err(AppError::Conflict {
                    resource: "unit".to_string(),
                    message: format!(
                        "Unit of {} cannot change while {} recipes use it",
                        ingredient.name,
                        using_recipes.len()
                    ),
                    message_ko: "레시피에서 사용 중인 재료의 단위는 변경할 수 없습니다.".to_string(),
                });
            }
            ingredient.unit = unit;
        }
        if let Some(name) = &input.name {
            ingredient.name = name.trim().to_string();
        }
        if input.vendor.is_some() {
            ingredient.vendor = input.vendor.clone();
        }
        if input.notes.is_some() {
            ingredient.notes = input.notes.clone();
        }
        ingredient.updated_at = chrono::Utc::now();

        let mut stock_reconciliation = None;
        if input.touches_purchase() {
            let price = input.purchase_price.unwrap_or(ingredient.purchase_price);
            let quantity = input.purchase_quantity.unwrap_or(ingredient.purchase_quantity);
            let change = ingredient.update_purchase(price, quantity);

            if change.quantity_changed() {
                if let Some(record) = tx.find_inventory(ingredient.id).await? {
                    let outcome = reconcile(&PurchaseEdit {
                        previous_quantity: change.previous_quantity,
                        new_quantity: change.new_quantity,
                        original_stock_before_edit: change.original_stock_before_edit,
                        remaining_stock: record.remaining_stock,
                    });

                    if let Reconciliation::Floored { used_so_far, deficit } = outcome {
                        tracing::warn!(
                            "Stock drift on ingredient {}: {} already used exceeds new capacity {} by {}",
                            ingredient.id,
                            used_so_far,
                            change.new_quantity,
                            deficit
                        );
                    }

                    if outcome.abandons_pending() {
                        tracing::debug!(
                            "Ingredient {} shrank below its original purchase with nothing used; next added line is dropped",
                            ingredient.id
                        );
                    }

                    tx.apply_reconciliation(ingredient.id, &outcome).await?;
                    stock_reconciliation = Some(outcome);
                }
            }
        }

        tx.update_ingredient(&ingredient).await?;

        if input.touches_purchase() {
            for recipe_id in &using_recipes {
                refresh_recipe_costs(&mut tx, store_id, *recipe_id).await?;
            }
        }

        tx.commit().await?;

        tracing::info!("Updated ingredient {}", ingredient.id);

        Ok(IngredientUpdate {
            ingredient: ingredient.into(),
            stock_reconciliation,
        })
    }

    /// Delete an ingredient, the recipe lines using it and its inventory
    pub async fn delete(&self, store_id: Uuid, ingredient_id: Uuid) -> AppResult<()> {
        let mut tx = self.repo.begin().await?;
        let ingredient = lock_ingredient(&mut tx, store_id, ingredient_id).await?;

        let affected = tx.delete_items_for_ingredient(ingredient.id).await?;
        tx.delete_ingredient(ingredient.id).await?;

        for recipe_id in &affected {
            refresh_recipe_costs(&mut tx, store_id, *recipe_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Deleted ingredient {} and its lines in {} recipes",
            ingredient.id,
            affected.len()
        );
        Ok(())
    }
}

async fn find_ingredient<T: RepositoryTx>(tx: &mut T, store_id: Uuid, ingredient_id: Uuid) -> AppResult<Ingredient> {
    tx.find_ingredient(store_id, ingredient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
}

/// Load the ingredient and hold its row until the transaction ends
async fn lock_ingredient<T: RepositoryTx>(tx: &mut T, store_id: Uuid, ingredient_id: Uuid) -> AppResult<Ingredient> {
    tx.find_ingredient_for_update(store_id, ingredient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
}
