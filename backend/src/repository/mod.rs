//! Persistence port for the costing and stock ledger services
//!
//! Every service call opens one [`RepositoryTx`], performs all of its reads
//! and writes through it and commits once. Dropping a transaction without
//! committing discards everything it did.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{Ingredient, InventoryRecord, Recipe, RecipeItem, Reconciliation};
use uuid::Uuid;

use crate::error::AppResult;

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Source of transactions
#[async_trait]
pub trait Repository: Clone + Send + Sync + 'static {
    type Tx: RepositoryTx;

    /// Start a transaction
    async fn begin(&self) -> AppResult<Self::Tx>;
}

/// One atomic unit of work over ingredients, inventory and recipes
#[async_trait]
pub trait RepositoryTx: Send {
    // Ingredients
    async fn insert_ingredient(&mut self, ingredient: &Ingredient) -> AppResult<()>;

    async fn find_ingredient(&mut self, store_id: Uuid, id: Uuid) -> AppResult<Option<Ingredient>>;

    /// Like `find_ingredient`, but locks the row for the rest of the transaction
    async fn find_ingredient_for_update(&mut self, store_id: Uuid, id: Uuid) -> AppResult<Option<Ingredient>>;

    async fn list_ingredients(&mut self, store_id: Uuid) -> AppResult<Vec<Ingredient>>;

    async fn update_ingredient(&mut self, ingredient: &Ingredient) -> AppResult<()>;

    /// Delete an ingredient together with its inventory record
    async fn delete_ingredient(&mut self, id: Uuid) -> AppResult<()>;

    // Inventory

    /// Inventory record of an ingredient, locked for the rest of the transaction
    async fn find_inventory(&mut self, ingredient_id: Uuid) -> AppResult<Option<InventoryRecord>>;

    /// Insert `record` unless one exists; returns whichever record is stored
    async fn insert_inventory_if_absent(&mut self, record: &InventoryRecord) -> AppResult<InventoryRecord>;

    /// Subtract `amount` in one conditional step, clearing `abandon_pending`.
    ///
    /// Returns the new balance, or `None` (record untouched) when less than
    /// `amount` is left or no record exists.
    async fn consume_if_available(&mut self, ingredient_id: Uuid, amount: Decimal) -> AppResult<Option<Decimal>>;

    /// Add `amount` in one step, capped at `capacity`; returns the new balance
    async fn credit_capped(&mut self, ingredient_id: Uuid, amount: Decimal, capacity: Decimal) -> AppResult<Decimal>;

    /// Store the balance and abandon flag produced by a purchase edit
    async fn apply_reconciliation(&mut self, ingredient_id: Uuid, outcome: &Reconciliation) -> AppResult<()>;

    async fn clear_abandon_pending(&mut self, ingredient_id: Uuid) -> AppResult<()>;

    // Recipes
    async fn insert_recipe(&mut self, recipe: &Recipe) -> AppResult<()>;

    async fn find_recipe(&mut self, store_id: Uuid, id: Uuid) -> AppResult<Option<Recipe>>;

    async fn list_recipes(&mut self, store_id: Uuid) -> AppResult<Vec<Recipe>>;

    async fn update_recipe(&mut self, recipe: &Recipe) -> AppResult<()>;

    /// Delete a recipe together with its items
    async fn delete_recipe(&mut self, id: Uuid) -> AppResult<()>;

    /// Items of a recipe ordered by position
    async fn recipe_items(&mut self, recipe_id: Uuid) -> AppResult<Vec<RecipeItem>>;

    /// Delete every item of the recipe and insert `items`
    async fn replace_recipe_items(&mut self, recipe_id: Uuid, items: &[RecipeItem]) -> AppResult<()>;

    async fn recipe_ids_using_ingredient(&mut self, ingredient_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Delete items referencing an ingredient; returns the affected recipe ids
    async fn delete_items_for_ingredient(&mut self, ingredient_id: Uuid) -> AppResult<Vec<Uuid>>;

    async fn commit(self) -> AppResult<()>;
}
