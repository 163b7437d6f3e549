//! Inventory ledger service for reserving and restoring ingredient stock
//!
//! The free functions operate on an open transaction so recipe and
//! ingredient flows can move stock as part of their own unit of work.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use shared::{validate_quantity_precision, Ingredient, InventoryRecord, InventorySnapshot, StockError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::repository::{PgRepository, Repository, RepositoryTx};

/// Inventory record of `ingredient`, seeded at its purchase quantity on first access
pub async fn get_or_create<T: RepositoryTx>(tx: &mut T, ingredient: &Ingredient) -> AppResult<InventoryRecord> {
    match tx.find_inventory(ingredient.id).await? {
        Some(record) => Ok(record),
        None => {
            tracing::debug!("Seeding inventory for ingredient {}", ingredient.id);
            tx.insert_inventory_if_absent(&InventoryRecord::seeded(ingredient))
                .await
        }
    }
}

/// Distinct ingredients in ascending id order
pub fn lock_order<'a>(ingredients: impl IntoIterator<Item = &'a Ingredient>) -> Vec<&'a Ingredient> {
    let ordered: BTreeMap<Uuid, &Ingredient> = ingredients
        .into_iter()
        .map(|ingredient| (ingredient.id, ingredient))
        .collect();
    ordered.into_values().collect()
}

/// Lock the inventory records of `ingredients` before moving any stock.
///
/// Rows are always locked in [`lock_order`], so two transactions touching the
/// same ingredients never wait on each other in a cycle.
pub async fn lock_in_order<'a, T: RepositoryTx>(
    tx: &mut T,
    ingredients: impl IntoIterator<Item = &'a Ingredient>,
) -> AppResult<BTreeMap<Uuid, InventoryRecord>> {
    let ordered = lock_order(ingredients);
    let mut records = BTreeMap::new();
    for ingredient in ordered {
        records.insert(ingredient.id, get_or_create(tx, ingredient).await?);
    }
    Ok(records)
}

/// Subtract `amount` from the stock of `ingredient`, or fail without touching it
pub async fn reserve_if_available<T: RepositoryTx>(
    tx: &mut T,
    ingredient: &Ingredient,
    amount: Decimal,
) -> AppResult<Decimal> {
    get_or_create(tx, ingredient).await?;

    match tx.consume_if_available(ingredient.id, amount).await? {
        Some(remaining) => Ok(remaining),
        None => {
            let available = tx
                .find_inventory(ingredient.id)
                .await?
                .map(|record| record.remaining_stock)
                .unwrap_or(Decimal::ZERO);

            tracing::debug!(
                "Insufficient stock for {}: requested {}, available {}",
                ingredient.id,
                amount,
                available
            );

            Err(AppError::from_stock(
                StockError::InsufficientStock {
                    ingredient_id: ingredient.id,
                    requested: amount,
                    available,
                },
                &ingredient.name,
            ))
        }
    }
}

/// Add `amount` back, never above the current purchase quantity
pub async fn restore<T: RepositoryTx>(tx: &mut T, ingredient: &Ingredient, amount: Decimal) -> AppResult<Decimal> {
    get_or_create(tx, ingredient).await?;
    tx.credit_capped(ingredient.id, amount, ingredient.purchase_quantity)
        .await
}

/// Inventory service for stock snapshots and direct stock movements
#[derive(Clone)]
pub struct InventoryService<R = PgRepository> {
    repo: R,
}

impl InventoryService {
    pub fn new(db: PgPool) -> Self {
        Self {
            repo: PgRepository::new(db),
        }
    }
}

impl<R: Repository> InventoryService<R> {
    pub fn with_repository(repo: R) -> Self {
        Self { repo }
    }

    /// Stock of every ingredient of the store
    pub async fn list(&self, store_id: Uuid) -> AppResult<Vec<InventorySnapshot>> {
        let mut tx = self.repo.begin().await?;

        let ingredients = tx.list_ingredients(store_id).await?;
        let mut snapshots = Vec::with_capacity(ingredients.len());
        for ingredient in &ingredients {
            let record = get_or_create(&mut tx, ingredient).await?;
            snapshots.push(InventorySnapshot::new(ingredient, &record));
        }

        tx.commit().await?;
        Ok(snapshots)
    }

    /// Stock of one ingredient
    pub async fn get(&self, store_id: Uuid, ingredient_id: Uuid) -> AppResult<InventorySnapshot> {
        let mut tx = self.repo.begin().await?;
        let ingredient = find_ingredient(&mut tx, store_id, ingredient_id).await?;
        let record = get_or_create(&mut tx, &ingredient).await?;
        tx.commit().await?;

        Ok(InventorySnapshot::new(&ingredient, &record))
    }

    /// Reserve stock in its own transaction
    pub async fn reserve_if_available(
        &self,
        store_id: Uuid,
        ingredient_id: Uuid,
        amount: Decimal,
    ) -> AppResult<InventorySnapshot> {
        let mut tx = self.repo.begin().await?;
        let ingredient = find_ingredient(&mut tx, store_id, ingredient_id).await?;
        let remaining = reserve_if_available(&mut tx, &ingredient, amount).await?;
        tx.commit().await?;

        Ok(snapshot(&ingredient, remaining))
    }

    /// Use stock outside of any recipe
    pub async fn use_direct(&self, store_id: Uuid, ingredient_id: Uuid, amount: Decimal) -> AppResult<InventorySnapshot> {
        check_amount(amount)?;

        let snapshot = self.reserve_if_available(store_id, ingredient_id, amount).await?;
        tracing::info!(
            "Used {} of ingredient {} directly, {} left",
            amount,
            ingredient_id,
            snapshot.remaining_stock
        );
        Ok(snapshot)
    }

    /// Put stock back outside of any recipe
    pub async fn restore(&self, store_id: Uuid, ingredient_id: Uuid, amount: Decimal) -> AppResult<InventorySnapshot> {
        check_amount(amount)?;

        let mut tx = self.repo.begin().await?;
        let ingredient = find_ingredient(&mut tx, store_id, ingredient_id).await?;
        let remaining = restore(&mut tx, &ingredient, amount).await?;
        tx.commit().await?;

        tracing::info!("Restored {} of ingredient {}, {} left", amount, ingredient_id, remaining);
        Ok(snapshot(&ingredient, remaining))
    }
}

/// Direct movements must be positive and fit the stored precision
fn check_amount(amount: Decimal) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::from_stock(StockError::NonPositiveAmount(amount), ""));
    }
    validate_quantity_precision(amount).map_err(|e| AppError::validation("amount", e, "유효한 사용량을 입력하세요."))
}

async fn find_ingredient<T: RepositoryTx>(tx: &mut T, store_id: Uuid, ingredient_id: Uuid) -> AppResult<Ingredient> {
    tx.find_ingredient(store_id, ingredient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
}

fn snapshot(ingredient: &Ingredient, remaining_stock: Decimal) -> InventorySnapshot {
    InventorySnapshot {
        ingredient_id: ingredient.id,
        ingredient_name: ingredient.name.clone(),
        remaining_stock,
        unit: ingredient.unit,
        unit_cost: ingredient.unit_cost(),
    }
}
