//! Recipe (bill of materials) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::costing::{effective_batch_size, CostBreakdown};
use crate::types::Unit;

/// A named output produced in batches from a list of ingredient lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub sales_price_per_item: Option<Decimal>,
    pub production_quantity_per_batch: i32,
    pub is_favorite: bool,
    /// Cached from the last cost calculation
    pub total_material_cost: Decimal,
    /// Cached from the last cost calculation
    pub cost_per_item: Decimal,
    /// Cached from the last cost calculation
    pub material_ratio: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// New recipe with empty cost caches; the batch size is normalized
    pub fn new(
        store_id: Uuid,
        name: impl Into<String>,
        sales_price_per_item: Option<Decimal>,
        production_quantity_per_batch: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            store_id,
            name: name.into(),
            sales_price_per_item,
            production_quantity_per_batch: effective_batch_size(production_quantity_per_batch),
            is_favorite: false,
            total_material_cost: Decimal::ZERO,
            cost_per_item: Decimal::ZERO,
            material_ratio: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Store the calculator outputs on the recipe
    pub fn apply_costs(&mut self, costs: &CostBreakdown) {
        self.total_material_cost = costs.total_material_cost;
        self.cost_per_item = costs.cost_per_item;
        self.material_ratio = costs.material_ratio;
        self.updated_at = Utc::now();
    }
}

/// One bill-of-materials line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeItem {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity_used: Decimal,
    pub unit: Unit,
    /// Position of the line in the submitted composition
    pub position: i32,
}

impl RecipeItem {
    pub fn new(recipe_id: Uuid, ingredient_id: Uuid, quantity_used: Decimal, unit: Unit, position: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipe_id,
            ingredient_id,
            quantity_used,
            unit,
            position,
        }
    }
}

/// A composition line as submitted by clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeLineInput {
    pub ingredient_id: Uuid,
    pub quantity_used: Decimal,
    /// Defaults to the ingredient's unit
    pub unit: Option<Unit>,
}

/// Input for creating a recipe together with its composition
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipeInput {
    pub name: String,
    pub sales_price_per_item: Option<Decimal>,
    pub production_quantity_per_batch: i32,
    pub is_favorite: Option<bool>,
    #[serde(default)]
    pub items: Vec<RecipeLineInput>,
}

/// Input for updating a recipe
///
/// When `items` is present the whole composition is replaced.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRecipeInput {
    pub name: Option<String>,
    pub sales_price_per_item: Option<Decimal>,
    pub production_quantity_per_batch: Option<i32>,
    pub is_favorite: Option<bool>,
    pub items: Option<Vec<RecipeLineInput>>,
}

/// Input for toggling the favorite flag
#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteInput {
    pub is_favorite: bool,
}

/// Line of a cost preview that is not persisted
#[derive(Debug, Clone, Deserialize)]
pub struct CostPreviewLine {
    pub ingredient_id: Uuid,
    pub quantity_used: Decimal,
}

/// Input for calculating costs without creating a recipe
#[derive(Debug, Clone, Deserialize)]
pub struct CostPreviewInput {
    pub sales_price_per_item: Option<Decimal>,
    pub production_quantity_per_batch: i32,
    pub items: Vec<CostPreviewLine>,
}

/// Per-ingredient cost line as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientCost {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: Unit,
    pub unit_price: Decimal,
    pub required_amount: Decimal,
    pub cost: Decimal,
    pub ratio: Decimal,
}

/// Cost summary of a composition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeCostReport {
    pub ingredient_costs: Vec<IngredientCost>,
    pub total_material_cost: Decimal,
    pub cost_per_item: Decimal,
    pub material_ratio: Decimal,
}

/// Recipe with its composition and cost breakdown
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub items: Vec<RecipeItem>,
    pub costs: RecipeCostReport,
}
