//! PostgreSQL adapter for the repository port

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{Ingredient, InventoryRecord, Recipe, RecipeItem, Reconciliation, Unit};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Repository, RepositoryTx};
use crate::error::{AppError, AppResult};

/// Repository backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgRepository {
    db: PgPool,
}

impl PgRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// An open PostgreSQL transaction
pub struct PgRepositoryTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Repository for PgRepository {
    type Tx = PgRepositoryTx;

    async fn begin(&self) -> AppResult<Self::Tx> {
        Ok(PgRepositoryTx {
            tx: self.db.begin().await?,
        })
    }
}

// ============================================================================
// Rows
// ============================================================================

fn parse_unit(code: &str) -> AppResult<Unit> {
    Unit::from_code(code).ok_or_else(|| AppError::Internal(format!("Unknown unit code '{}'", code)))
}

#[derive(Debug, FromRow)]
struct IngredientRow {
    id: Uuid,
    store_id: Uuid,
    name: String,
    purchase_price: Decimal,
    purchase_quantity: Decimal,
    unit: String,
    vendor: Option<String>,
    notes: Option<String>,
    original_stock_before_edit: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IngredientRow> for Ingredient {
    type Error = AppError;

    fn try_from(row: IngredientRow) -> AppResult<Self> {
        Ok(Ingredient {
            id: row.id,
            store_id: row.store_id,
            name: row.name,
            purchase_price: row.purchase_price,
            purchase_quantity: row.purchase_quantity,
            unit: parse_unit(&row.unit)?,
            vendor: row.vendor,
            notes: row.notes,
            original_stock_before_edit: row.original_stock_before_edit,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct InventoryRow {
    ingredient_id: Uuid,
    remaining_stock: Decimal,
    abandon_pending: bool,
    updated_at: DateTime<Utc>,
}

impl From<InventoryRow> for InventoryRecord {
    fn from(row: InventoryRow) -> Self {
        InventoryRecord {
            ingredient_id: row.ingredient_id,
            remaining_stock: row.remaining_stock,
            abandon_pending: row.abandon_pending,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: Uuid,
    store_id: Uuid,
    name: String,
    sales_price_per_item: Option<Decimal>,
    production_quantity_per_batch: i32,
    is_favorite: bool,
    total_material_cost: Decimal,
    cost_per_item: Decimal,
    material_ratio: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Recipe {
            id: row.id,
            store_id: row.store_id,
            name: row.name,
            sales_price_per_item: row.sales_price_per_item,
            production_quantity_per_batch: row.production_quantity_per_batch,
            is_favorite: row.is_favorite,
            total_material_cost: row.total_material_cost,
            cost_per_item: row.cost_per_item,
            material_ratio: row.material_ratio,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RecipeItemRow {
    id: Uuid,
    recipe_id: Uuid,
    ingredient_id: Uuid,
    quantity_used: Decimal,
    unit: String,
    position: i32,
}

impl TryFrom<RecipeItemRow> for RecipeItem {
    type Error = AppError;

    fn try_from(row: RecipeItemRow) -> AppResult<Self> {
        Ok(RecipeItem {
            id: row.id,
            recipe_id: row.recipe_id,
            ingredient_id: row.ingredient_id,
            quantity_used: row.quantity_used,
            unit: parse_unit(&row.unit)?,
            position: row.position,
        })
    }
}

const INGREDIENT_COLUMNS: &str = "id, store_id, name, purchase_price, purchase_quantity, unit, vendor, notes, \
     original_stock_before_edit, created_at, updated_at";

const RECIPE_COLUMNS: &str = "id, store_id, name, sales_price_per_item, production_quantity_per_batch, is_favorite, \
     total_material_cost, cost_per_item, material_ratio, created_at, updated_at";

// ============================================================================
// Transaction
// ============================================================================

#[async_trait]
impl RepositoryTx for PgRepositoryTx {
    async fn insert_ingredient(&mut self, ingredient: &Ingredient) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ingredients (
                id, store_id, name, purchase_price, purchase_quantity, unit, vendor, notes,
                original_stock_before_edit, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(ingredient.id)
        .bind(ingredient.store_id)
        .bind(&ingredient.name)
        .bind(ingredient.purchase_price)
        .bind(ingredient.purchase_quantity)
        .bind(ingredient.unit.as_str())
        .bind(&ingredient.vendor)
        .bind(&ingredient.notes)
        .bind(ingredient.original_stock_before_edit)
        .bind(ingredient.created_at)
        .bind(ingredient.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn find_ingredient(&mut self, store_id: Uuid, id: Uuid) -> AppResult<Option<Ingredient>> {
        let row = sqlx::query_as::<_, IngredientRow>(&format!(
            "SELECT {} FROM ingredients WHERE id = $1 AND store_id = $2",
            INGREDIENT_COLUMNS
        ))
        .bind(id)
        .bind(store_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Ingredient::try_from).transpose()
    }

    async fn find_ingredient_for_update(&mut self, store_id: Uuid, id: Uuid) -> AppResult<Option<Ingredient>> {
        // NO KEY UPDATE leaves foreign key checks from recipe_items inserts unblocked
        let row = sqlx::query_as::<_, IngredientRow>(&format!(
            "SELECT {} FROM ingredients WHERE id = $1 AND store_id = $2 FOR NO KEY UPDATE",
            INGREDIENT_COLUMNS
        ))
        .bind(id)
        .bind(store_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Ingredient::try_from).transpose()
    }

    async fn list_ingredients(&mut self, store_id: Uuid) -> AppResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, IngredientRow>(&format!(
            "SELECT {} FROM ingredients WHERE store_id = $1 ORDER BY name, id",
            INGREDIENT_COLUMNS
        ))
        .bind(store_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(Ingredient::try_from).collect()
    }

    async fn update_ingredient(&mut self, ingredient: &Ingredient) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE ingredients
            SET name = $1, purchase_price = $2, purchase_quantity = $3, unit = $4, vendor = $5,
                notes = $6, original_stock_before_edit = $7, updated_at = $8
            WHERE id = $9
            "#,
        )
        .bind(&ingredient.name)
        .bind(ingredient.purchase_price)
        .bind(ingredient.purchase_quantity)
        .bind(ingredient.unit.as_str())
        .bind(&ingredient.vendor)
        .bind(&ingredient.notes)
        .bind(ingredient.original_stock_before_edit)
        .bind(ingredient.updated_at)
        .bind(ingredient.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_ingredient(&mut self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM inventories WHERE ingredient_id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn find_inventory(&mut self, ingredient_id: Uuid) -> AppResult<Option<InventoryRecord>> {
        let row = sqlx::query_as::<_, InventoryRow>(
            r#"
            SELECT ingredient_id, remaining_stock, abandon_pending, updated_at
            FROM inventories
            WHERE ingredient_id = $1
            FOR UPDATE
            "#,
        )
        .bind(ingredient_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_inventory_if_absent(&mut self, record: &InventoryRecord) -> AppResult<InventoryRecord> {
        sqlx::query(
            r#"
            INSERT INTO inventories (ingredient_id, remaining_stock, abandon_pending, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (ingredient_id) DO NOTHING
            "#,
        )
        .bind(record.ingredient_id)
        .bind(record.remaining_stock)
        .bind(record.abandon_pending)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await?;

        self.find_inventory(record.ingredient_id)
            .await?
            .ok_or_else(|| AppError::Internal("Inventory record vanished after insert".to_string()))
    }

    async fn consume_if_available(&mut self, ingredient_id: Uuid, amount: Decimal) -> AppResult<Option<Decimal>> {
        let remaining = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE inventories
            SET remaining_stock = remaining_stock - $2, abandon_pending = FALSE, updated_at = NOW()
            WHERE ingredient_id = $1 AND remaining_stock >= $2
            RETURNING remaining_stock
            "#,
        )
        .bind(ingredient_id)
        .bind(amount)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(remaining)
    }

    async fn credit_capped(&mut self, ingredient_id: Uuid, amount: Decimal, capacity: Decimal) -> AppResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE inventories
            SET remaining_stock = LEAST(remaining_stock + $2, $3), updated_at = NOW()
            WHERE ingredient_id = $1
            RETURNING remaining_stock
            "#,
        )
        .bind(ingredient_id)
        .bind(amount)
        .bind(capacity)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory".to_string()))
    }

    async fn apply_reconciliation(&mut self, ingredient_id: Uuid, outcome: &Reconciliation) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE inventories
            SET remaining_stock = $2, abandon_pending = $3, updated_at = NOW()
            WHERE ingredient_id = $1
            "#,
        )
        .bind(ingredient_id)
        .bind(outcome.remaining_stock())
        .bind(outcome.abandons_pending())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn clear_abandon_pending(&mut self, ingredient_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE inventories SET abandon_pending = FALSE WHERE ingredient_id = $1")
            .bind(ingredient_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn insert_recipe(&mut self, recipe: &Recipe) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO recipes (
                id, store_id, name, sales_price_per_item, production_quantity_per_batch, is_favorite,
                total_material_cost, cost_per_item, material_ratio, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(recipe.id)
        .bind(recipe.store_id)
        .bind(&recipe.name)
        .bind(recipe.sales_price_per_item)
        .bind(recipe.production_quantity_per_batch)
        .bind(recipe.is_favorite)
        .bind(recipe.total_material_cost)
        .bind(recipe.cost_per_item)
        .bind(recipe.material_ratio)
        .bind(recipe.created_at)
        .bind(recipe.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn find_recipe(&mut self, store_id: Uuid, id: Uuid) -> AppResult<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {} FROM recipes WHERE id = $1 AND store_id = $2",
            RECIPE_COLUMNS
        ))
        .bind(id)
        .bind(store_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_recipes(&mut self, store_id: Uuid) -> AppResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {} FROM recipes WHERE store_id = $1 ORDER BY is_favorite DESC, name, id",
            RECIPE_COLUMNS
        ))
        .bind(store_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_recipe(&mut self, recipe: &Recipe) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE recipes
            SET name = $1, sales_price_per_item = $2, production_quantity_per_batch = $3,
                is_favorite = $4, total_material_cost = $5, cost_per_item = $6,
                material_ratio = $7, updated_at = $8
            WHERE id = $9
            "#,
        )
        .bind(&recipe.name)
        .bind(recipe.sales_price_per_item)
        .bind(recipe.production_quantity_per_batch)
        .bind(recipe.is_favorite)
        .bind(recipe.total_material_cost)
        .bind(recipe.cost_per_item)
        .bind(recipe.material_ratio)
        .bind(recipe.updated_at)
        .bind(recipe.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_recipe(&mut self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM recipe_items WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn recipe_items(&mut self, recipe_id: Uuid) -> AppResult<Vec<RecipeItem>> {
        let rows = sqlx::query_as::<_, RecipeItemRow>(
            r#"
            SELECT id, recipe_id, ingredient_id, quantity_used, unit, position
            FROM recipe_items
            WHERE recipe_id = $1
            ORDER BY position
            "#,
        )
        .bind(recipe_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(RecipeItem::try_from).collect()
    }

    async fn replace_recipe_items(&mut self, recipe_id: Uuid, items: &[RecipeItem]) -> AppResult<()> {
        sqlx::query("DELETE FROM recipe_items WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *self.tx)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO recipe_items (id, recipe_id, ingredient_id, quantity_used, unit, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(item.id)
            .bind(recipe_id)
            .bind(item.ingredient_id)
            .bind(item.quantity_used)
            .bind(item.unit.as_str())
            .bind(item.position)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn recipe_ids_using_ingredient(&mut self, ingredient_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT recipe_id FROM recipe_items WHERE ingredient_id = $1",
        )
        .bind(ingredient_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids)
    }

    async fn delete_items_for_ingredient(&mut self, ingredient_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut ids = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM recipe_items WHERE ingredient_id = $1 RETURNING recipe_id",
        )
        .bind(ingredient_id)
        .fetch_all(&mut *self.tx)
        .await?;

        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
