//! In-process adapter for the repository port
//!
//! Transactions are serialized: `begin` holds the state lock until the
//! transaction commits or is dropped. Writes go to a staged copy that only
//! replaces the shared state on commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::{Ingredient, InventoryRecord, Recipe, RecipeItem, Reconciliation};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Repository, RepositoryTx};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    ingredients: HashMap<Uuid, Ingredient>,
    inventories: HashMap<Uuid, InventoryRecord>,
    recipes: HashMap<Uuid, Recipe>,
    items: HashMap<Uuid, Vec<RecipeItem>>,
}

/// Repository keeping everything in memory
#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl Repository for MemoryRepository {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<Self::Tx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx { guard, staged })
    }
}

#[async_trait]
impl RepositoryTx for MemoryTx {
    async fn insert_ingredient(&mut self, ingredient: &Ingredient) -> AppResult<()> {
        self.staged.ingredients.insert(ingredient.id, ingredient.clone());
        Ok(())
    }

    async fn find_ingredient(&mut self, store_id: Uuid, id: Uuid) -> AppResult<Option<Ingredient>> {
        Ok(self
            .staged
            .ingredients
            .get(&id)
            .filter(|i| i.store_id == store_id)
            .cloned())
    }

    async fn find_ingredient_for_update(&mut self, store_id: Uuid, id: Uuid) -> AppResult<Option<Ingredient>> {
        // The transaction already holds the whole store
        self.find_ingredient(store_id, id).await
    }

    async fn list_ingredients(&mut self, store_id: Uuid) -> AppResult<Vec<Ingredient>> {
        let mut ingredients: Vec<Ingredient> = self
            .staged
            .ingredients
            .values()
            .filter(|i| i.store_id == store_id)
            .cloned()
            .collect();
        ingredients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(ingredients)
    }

    async fn update_ingredient(&mut self, ingredient: &Ingredient) -> AppResult<()> {
        if let Some(stored) = self.staged.ingredients.get_mut(&ingredient.id) {
            *stored = ingredient.clone();
        }
        Ok(())
    }

    async fn delete_ingredient(&mut self, id: Uuid) -> AppResult<()> {
        self.staged.inventories.remove(&id);
        self.staged.ingredients.remove(&id);
        Ok(())
    }

    async fn find_inventory(&mut self, ingredient_id: Uuid) -> AppResult<Option<InventoryRecord>> {
        Ok(self.staged.inventories.get(&ingredient_id).cloned())
    }

    async fn insert_inventory_if_absent(&mut self, record: &InventoryRecord) -> AppResult<InventoryRecord> {
        Ok(self
            .staged
            .inventories
            .entry(record.ingredient_id)
            .or_insert_with(|| record.clone())
            .clone())
    }

    async fn consume_if_available(&mut self, ingredient_id: Uuid, amount: Decimal) -> AppResult<Option<Decimal>> {
        Ok(self
            .staged
            .inventories
            .get_mut(&ingredient_id)
            .and_then(|record| record.reserve(amount).ok()))
    }

    async fn credit_capped(&mut self, ingredient_id: Uuid, amount: Decimal, capacity: Decimal) -> AppResult<Decimal> {
        self.staged
            .inventories
            .get_mut(&ingredient_id)
            .map(|record| record.restore(amount, capacity))
            .ok_or_else(|| AppError::NotFound("Inventory".to_string()))
    }

    async fn apply_reconciliation(&mut self, ingredient_id: Uuid, outcome: &Reconciliation) -> AppResult<()> {
        if let Some(record) = self.staged.inventories.get_mut(&ingredient_id) {
            record.remaining_stock = outcome.remaining_stock();
            record.abandon_pending = outcome.abandons_pending();
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn clear_abandon_pending(&mut self, ingredient_id: Uuid) -> AppResult<()> {
        if let Some(record) = self.staged.inventories.get_mut(&ingredient_id) {
            record.abandon_pending = false;
        }
        Ok(())
    }

    async fn insert_recipe(&mut self, recipe: &Recipe) -> AppResult<()> {
        self.staged.recipes.insert(recipe.id, recipe.clone());
        Ok(())
    }

    async fn find_recipe(&mut self, store_id: Uuid, id: Uuid) -> AppResult<Option<Recipe>> {
        Ok(self
            .staged
            .recipes
            .get(&id)
            .filter(|r| r.store_id == store_id)
            .cloned())
    }

    async fn list_recipes(&mut self, store_id: Uuid) -> AppResult<Vec<Recipe>> {
        let mut recipes: Vec<Recipe> = self
            .staged
            .recipes
            .values()
            .filter(|r| r.store_id == store_id)
            .cloned()
            .collect();
        recipes.sort_by(|a, b| {
            b.is_favorite
                .cmp(&a.is_favorite)
                .then(a.name.cmp(&b.name))
                .then(a.id.cmp(&b.id))
        });
        Ok(recipes)
    }

    async fn update_recipe(&mut self, recipe: &Recipe) -> AppResult<()> {
        if let Some(stored) = self.staged.recipes.get_mut(&recipe.id) {
            *stored = recipe.clone();
        }
        Ok(())
    }

    async fn delete_recipe(&mut self, id: Uuid) -> AppResult<()> {
        self.staged.items.remove(&id);
        self.staged.recipes.remove(&id);
        Ok(())
    }

    async fn recipe_items(&mut self, recipe_id: Uuid) -> AppResult<Vec<RecipeItem>> {
        let mut items = self.staged.items.get(&recipe_id).cloned().unwrap_or_default();
        items.sort_by_key(|item| item.position);
        Ok(items)
    }

    async fn replace_recipe_items(&mut self, recipe_id: Uuid, items: &[RecipeItem]) -> AppResult<()> {
        self.staged.items.insert(recipe_id, items.to_vec());
        Ok(())
    }

    async fn recipe_ids_using_ingredient(&mut self, ingredient_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .staged
            .items
            .iter()
            .filter(|(_, items)| items.iter().any(|item| item.ingredient_id == ingredient_id))
            .map(|(recipe_id, _)| *recipe_id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete_items_for_ingredient(&mut self, ingredient_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut affected = Vec::new();
        for (recipe_id, items) in self.staged.items.iter_mut() {
            let before = items.len();
            items.retain(|item| item.ingredient_id != ingredient_id);
            if items.len() != before {
                affected.push(*recipe_id);
            }
        }
        affected.sort();
        Ok(affected)
    }

    async fn commit(self) -> AppResult<()> {
        let MemoryTx { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::Unit;

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let repo = MemoryRepository::new();
        let store_id = Uuid::new_v4();
        let flour = Ingredient::new(store_id, "Flour", dec!(5000), dec!(1000), Unit::Mass);

        {
            let mut tx = repo.begin().await.unwrap();
            tx.insert_ingredient(&flour).await.unwrap();
        }

        let mut tx = repo.begin().await.unwrap();
        assert!(tx.find_ingredient(store_id, flour.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_consume_is_conditional() {
        let repo = MemoryRepository::new();
        let flour = Ingredient::new(Uuid::new_v4(), "Flour", dec!(5000), dec!(10), Unit::Mass);

        let mut tx = repo.begin().await.unwrap();
        tx.insert_ingredient(&flour).await.unwrap();
        tx.insert_inventory_if_absent(&InventoryRecord::seeded(&flour)).await.unwrap();

        assert_eq!(tx.consume_if_available(flour.id, dec!(6)).await.unwrap(), Some(dec!(4)));
        assert_eq!(tx.consume_if_available(flour.id, dec!(6)).await.unwrap(), None);
        assert_eq!(tx.credit_capped(flour.id, dec!(20), dec!(10)).await.unwrap(), dec!(10));
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_inventory_keeps_existing_record() {
        let repo = MemoryRepository::new();
        let flour = Ingredient::new(Uuid::new_v4(), "Flour", dec!(5000), dec!(10), Unit::Mass);
        let mut tx = repo.begin().await.unwrap();

        let mut first = InventoryRecord::seeded(&flour);
        first.remaining_stock = dec!(3);
        tx.insert_inventory_if_absent(&first).await.unwrap();

        let stored = tx
            .insert_inventory_if_absent(&InventoryRecord::seeded(&flour))
            .await
            .unwrap();
        assert_eq!(stored.remaining_stock, dec!(3));
    }

    #[tokio::test]
    async fn test_abandon_flag_set_by_reconciliation_and_cleared_by_consumption() {
        let repo = MemoryRepository::new();
        let butter = Ingredient::new(Uuid::new_v4(), "Butter", dec!(5000), dec!(100), Unit::Mass);
        let mut tx = repo.begin().await.unwrap();
        tx.insert_inventory_if_absent(&InventoryRecord::seeded(&butter)).await.unwrap();

        let shrink = Reconciliation::ShrunkUnused {
            remaining_stock: dec!(40),
        };
        tx.apply_reconciliation(butter.id, &shrink).await.unwrap();
        let record = tx.find_inventory(butter.id).await.unwrap().unwrap();
        assert_eq!(record.remaining_stock, dec!(40));
        assert!(record.abandon_pending);

        tx.consume_if_available(butter.id, dec!(1)).await.unwrap();
        assert!(!tx.find_inventory(butter.id).await.unwrap().unwrap().abandon_pending);

        tx.apply_reconciliation(butter.id, &shrink).await.unwrap();
        tx.clear_abandon_pending(butter.id).await.unwrap();
        let record = tx.find_inventory(butter.id).await.unwrap().unwrap();
        assert!(!record.abandon_pending);
        assert_eq!(record.remaining_stock, dec!(40));
    }
}
