//! Recipe service: bill-of-materials lifecycle, stock movements and costing
//!
//! Every mutation runs in a single repository transaction. The inventory rows
//! of every touched ingredient are locked up front in id order, then stock is
//! reserved line by line, so an insufficient line rolls back the whole request.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use shared::{
    calculate_costs, diff_composition, effective_batch_size, pending_quantity_used, resolve_line_unit,
    validate_name, validate_quantity_precision, validate_quantity_used, validate_sales_price, CompositionLine,
    CostBreakdown, CostInput, CostPreviewInput, CreateRecipeInput, Ingredient, IngredientCost, Recipe,
    RecipeCostReport, RecipeDetail, RecipeItem, RecipeLineInput, UpdateRecipeInput, Unit,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::inventory;
use crate::error::{AppError, AppResult};
use crate::repository::{PgRepository, Repository, RepositoryTx};

const INVALID_INPUT_KO: &str = "입력값이 올바르지 않습니다.";

/// Recipe service
#[derive(Clone)]
pub struct RecipeService<R = PgRepository> {
    repo: R,
}

/// A validated composition line with its ingredient
#[derive(Debug, Clone)]
struct ResolvedLine {
    ingredient: Ingredient,
    quantity_used: Decimal,
    unit: Unit,
}

impl ResolvedLine {
    fn composition(&self) -> CompositionLine {
        CompositionLine {
            ingredient_id: self.ingredient.id,
            quantity_used: self.quantity_used,
            unit: self.unit,
        }
    }
}

impl RecipeService {
    pub fn new(db: PgPool) -> Self {
        Self {
            repo: PgRepository::new(db),
        }
    }
}

impl<R: Repository> RecipeService<R> {
    pub fn with_repository(repo: R) -> Self {
        Self { repo }
    }

    /// Create a recipe and reserve stock for every line, all or nothing
    pub async fn create(&self, store_id: Uuid, input: CreateRecipeInput) -> AppResult<RecipeDetail> {
        validate_name(&input.name).map_err(|e| AppError::validation("name", e, "레시피 이름을 입력하세요."))?;
        validate_sales_price(input.sales_price_per_item)
            .map_err(|e| AppError::validation("sales_price_per_item", e, "판매 가격을 확인하세요."))?;

        let batch = normalize_batch(input.production_quantity_per_batch);

        let mut tx = self.repo.begin().await?;
        let lines = resolve_lines(&mut tx, store_id, &input.items).await?;

        let mut recipe = Recipe::new(store_id, input.name.trim(), input.sales_price_per_item, batch);
        recipe.is_favorite = input.is_favorite.unwrap_or(false);

        let items: Vec<RecipeItem> = lines
            .iter()
            .enumerate()
            .map(|(position, line)| {
                RecipeItem::new(recipe.id, line.ingredient.id, line.quantity_used, line.unit, position as i32)
            })
            .collect();

        let priced: Vec<(Ingredient, Decimal)> = lines
            .iter()
            .map(|line| (line.ingredient.clone(), line.quantity_used))
            .collect();
        let (breakdown, costs) = cost_report(&priced, recipe.sales_price_per_item, batch);
        recipe.apply_costs(&breakdown);
        tx.insert_recipe(&recipe).await?;

        // A new recipe carries no quantities entered before a capacity edit,
        // so its lines reserve in full
        inventory::lock_in_order(&mut tx, lines.iter().map(|line| &line.ingredient)).await?;
        for line in &lines {
            inventory::reserve_if_available(&mut tx, &line.ingredient, line.quantity_used).await?;
        }

        tx.replace_recipe_items(recipe.id, &items).await?;
        tx.commit().await?;

        tracing::info!("Created recipe {} ({}) with {} lines", recipe.id, recipe.name, items.len());

        Ok(RecipeDetail { recipe, items, costs })
    }

    /// Recipe with its composition and cost breakdown
    pub async fn get(&self, store_id: Uuid, recipe_id: Uuid) -> AppResult<RecipeDetail> {
        let mut tx = self.repo.begin().await?;
        let recipe = find_recipe(&mut tx, store_id, recipe_id).await?;
        let items = tx.recipe_items(recipe.id).await?;
        let priced = item_costs(&mut tx, store_id, &items).await?;
        tx.commit().await?;

        let (_, costs) = cost_report(
            &priced,
            recipe.sales_price_per_item,
            recipe.production_quantity_per_batch,
        );

        Ok(RecipeDetail { recipe, items, costs })
    }

    /// Recipes of the store, favorites first
    pub async fn list(&self, store_id: Uuid) -> AppResult<Vec<Recipe>> {
        let mut tx = self.repo.begin().await?;
        let recipes = tx.list_recipes(store_id).await?;
        tx.commit().await?;
        Ok(recipes)
    }

    /// Update header fields and, when `items` is given, replace the composition
    pub async fn update(&self, store_id: Uuid, recipe_id: Uuid, input: UpdateRecipeInput) -> AppResult<RecipeDetail> {
        if let Some(name) = &input.name {
            validate_name(name).map_err(|e| AppError::validation("name", e, "레시피 이름을 입력하세요."))?;
        }
        if input.sales_price_per_item.is_some() {
            validate_sales_price(input.sales_price_per_item)
                .map_err(|e| AppError::validation("sales_price_per_item", e, "판매 가격을 확인하세요."))?;
        }

        let mut tx = self.repo.begin().await?;
        let mut recipe = find_recipe(&mut tx, store_id, recipe_id).await?;

        if let Some(name) = &input.name {
            recipe.name = name.trim().to_string();
        }
        if let Some(price) = input.sales_price_per_item {
            recipe.sales_price_per_item = Some(price);
        }
        if let Some(batch) = input.production_quantity_per_batch {
            recipe.production_quantity_per_batch = normalize_batch(batch);
        }
        if let Some(is_favorite) = input.is_favorite {
            recipe.is_favorite = is_favorite;
        }

        if let Some(next) = &input.items {
            let lines = resolve_lines(&mut tx, store_id, next).await?;
            replace_composition(&mut tx, &recipe, lines).await?;
        }

        let items = tx.recipe_items(recipe.id).await?;
        let priced = item_costs(&mut tx, store_id, &items).await?;
        let (breakdown, costs) = cost_report(
            &priced,
            recipe.sales_price_per_item,
            recipe.production_quantity_per_batch,
        );
        recipe.apply_costs(&breakdown);
        tx.update_recipe(&recipe).await?;
        tx.commit().await?;

        tracing::info!("Updated recipe {}", recipe.id);

        Ok(RecipeDetail { recipe, items, costs })
    }

    /// Restore the stock of every line and delete the recipe
    pub async fn delete(&self, store_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
        let mut tx = self.repo.begin().await?;
        let recipe = find_recipe(&mut tx, store_id, recipe_id).await?;
        let items = tx.recipe_items(recipe.id).await?;
        let restored = stored_lines(&mut tx, store_id, &items).await?;

        inventory::lock_in_order(&mut tx, restored.iter().map(|(ingredient, _)| ingredient)).await?;
        for (ingredient, quantity_used) in &restored {
            inventory::restore(&mut tx, ingredient, *quantity_used).await?;
        }

        tx.delete_recipe(recipe.id).await?;
        tx.commit().await?;

        tracing::info!("Deleted recipe {} and restored {} lines", recipe.id, items.len());
        Ok(())
    }

    pub async fn set_favorite(&self, store_id: Uuid, recipe_id: Uuid, is_favorite: bool) -> AppResult<Recipe> {
        let mut tx = self.repo.begin().await?;
        let mut recipe = find_recipe(&mut tx, store_id, recipe_id).await?;
        recipe.is_favorite = is_favorite;
        recipe.updated_at = chrono::Utc::now();
        tx.update_recipe(&recipe).await?;
        tx.commit().await?;
        Ok(recipe)
    }

    /// Cost a composition without saving it or touching stock
    pub async fn preview_costs(&self, store_id: Uuid, input: CostPreviewInput) -> AppResult<RecipeCostReport> {
        validate_sales_price(input.sales_price_per_item)
            .map_err(|e| AppError::validation("sales_price_per_item", e, "판매 가격을 확인하세요."))?;

        let mut tx = self.repo.begin().await?;
        let mut lines = Vec::with_capacity(input.items.len());
        for line in &input.items {
            if line.quantity_used < Decimal::ZERO {
                return Err(AppError::validation(
                    "items",
                    "Quantity used cannot be negative",
                    INVALID_INPUT_KO,
                ));
            }
            validate_quantity_precision(line.quantity_used)
                .map_err(|e| AppError::validation("items", e, INVALID_INPUT_KO))?;
            let ingredient = resolve_ingredient(&mut tx, store_id, line.ingredient_id).await?;
            lines.push((ingredient, line.quantity_used));
        }
        tx.commit().await?;

        let batch = normalize_batch(input.production_quantity_per_batch);
        let (_, report) = cost_report(&lines, input.sales_price_per_item, batch);
        Ok(report)
    }
}

/// Recompute and store the cached costs of a recipe inside `tx`
pub(crate) async fn refresh_recipe_costs<T: RepositoryTx>(tx: &mut T, store_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
    let Some(mut recipe) = tx.find_recipe(store_id, recipe_id).await? else {
        return Ok(());
    };
    let items = tx.recipe_items(recipe.id).await?;
    let priced = item_costs(tx, store_id, &items).await?;
    let (breakdown, _) = cost_report(
        &priced,
        recipe.sales_price_per_item,
        recipe.production_quantity_per_batch,
    );
    recipe.apply_costs(&breakdown);
    tx.update_recipe(&recipe).await?;

    tracing::debug!(
        "Refreshed costs of recipe {}: total {}",
        recipe.id,
        recipe.total_material_cost
    );
    Ok(())
}

/// Move stock for the difference between the stored and the next composition.
///
/// Lines on both sides move nothing. Added lines for an ingredient whose
/// ledger still asks to abandon pending usage are stored at zero, judged on
/// the ledger as it stands before any line is restored; the flag is then
/// cleared so it applies once.
async fn replace_composition<T: RepositoryTx>(tx: &mut T, recipe: &Recipe, next: Vec<ResolvedLine>) -> AppResult<()> {
    let current = tx.recipe_items(recipe.id).await?;
    let current_lines: Vec<CompositionLine> = current.iter().map(CompositionLine::from).collect();
    let next_lines: Vec<CompositionLine> = next.iter().map(ResolvedLine::composition).collect();
    let diff = diff_composition(&current_lines, &next_lines);

    let removed_items: Vec<RecipeItem> = diff.removed.iter().map(|&idx| current[idx].clone()).collect();
    let removed = stored_lines(tx, recipe.store_id, &removed_items).await?;

    let touched = removed
        .iter()
        .map(|(ingredient, _)| ingredient)
        .chain(diff.added.iter().map(|&idx| &next[idx].ingredient));
    let ledger = inventory::lock_in_order(tx, touched).await?;

    let mut quantities: Vec<Decimal> = next.iter().map(|line| line.quantity_used).collect();
    let mut abandoned = BTreeSet::new();
    for &idx in &diff.added {
        let line = &next[idx];
        let abandon = ledger
            .get(&line.ingredient.id)
            .map_or(false, |record| record.abandon_pending);
        let allowed = pending_quantity_used(abandon, line.quantity_used);
        if allowed != line.quantity_used {
            tracing::warn!(
                "Stock drift on ingredient {}: capacity shrank to {} with nothing used, line quantity {} forced to {}",
                line.ingredient.id,
                line.ingredient.purchase_quantity,
                line.quantity_used,
                allowed
            );
            abandoned.insert(line.ingredient.id);
        }
        quantities[idx] = allowed;
    }
    for ingredient_id in &abandoned {
        tx.clear_abandon_pending(*ingredient_id).await?;
    }

    for (ingredient, quantity_used) in &removed {
        inventory::restore(tx, ingredient, *quantity_used).await?;
    }

    for &idx in &diff.added {
        if quantities[idx] > Decimal::ZERO {
            inventory::reserve_if_available(tx, &next[idx].ingredient, quantities[idx]).await?;
        }
    }

    let items: Vec<RecipeItem> = next
        .iter()
        .zip(&quantities)
        .enumerate()
        .map(|(position, (line, quantity))| {
            RecipeItem::new(recipe.id, line.ingredient.id, *quantity, line.unit, position as i32)
        })
        .collect();
    tx.replace_recipe_items(recipe.id, &items).await?;

    tracing::debug!(
        "Replaced composition of recipe {}: {} kept, {} removed, {} added",
        recipe.id,
        diff.kept.len(),
        diff.removed.len(),
        diff.added.len()
    );
    Ok(())
}

/// `(ingredient, quantity_used)` of stored items whose ingredient still exists
async fn stored_lines<T: RepositoryTx>(
    tx: &mut T,
    store_id: Uuid,
    items: &[RecipeItem],
) -> AppResult<Vec<(Ingredient, Decimal)>> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        if let Some(ingredient) = tx.find_ingredient(store_id, item.ingredient_id).await? {
            lines.push((ingredient, item.quantity_used));
        }
    }
    Ok(lines)
}

fn normalize_batch(production_quantity_per_batch: i32) -> i32 {
    let batch = effective_batch_size(production_quantity_per_batch);
    if batch != production_quantity_per_batch {
        tracing::debug!("Batch size {} normalized to {}", production_quantity_per_batch, batch);
    }
    batch
}

async fn find_recipe<T: RepositoryTx>(tx: &mut T, store_id: Uuid, recipe_id: Uuid) -> AppResult<Recipe> {
    tx.find_recipe(store_id, recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe".to_string()))
}

async fn resolve_ingredient<T: RepositoryTx>(tx: &mut T, store_id: Uuid, ingredient_id: Uuid) -> AppResult<Ingredient> {
    tx.find_ingredient(store_id, ingredient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
}

/// Validate submitted lines and look up their ingredients
async fn resolve_lines<T: RepositoryTx>(
    tx: &mut T,
    store_id: Uuid,
    inputs: &[RecipeLineInput],
) -> AppResult<Vec<ResolvedLine>> {
    let mut cache: HashMap<Uuid, Ingredient> = HashMap::new();
    let mut lines = Vec::with_capacity(inputs.len());

    for input in inputs {
        validate_quantity_used(input.quantity_used)
            .map_err(|e| AppError::validation("items", e, "사용량을 확인하세요."))?;

        let ingredient = cached_ingredient(tx, &mut cache, store_id, input.ingredient_id).await?;
        let unit = resolve_line_unit(input, &ingredient)
            .map_err(|e| AppError::validation("items", e, "재료 단위와 일치해야 합니다."))?;

        lines.push(ResolvedLine {
            ingredient,
            quantity_used: input.quantity_used,
            unit,
        });
    }

    Ok(lines)
}

/// `(ingredient, quantity_used)` pairs of stored items, in item order
async fn item_costs<T: RepositoryTx>(
    tx: &mut T,
    store_id: Uuid,
    items: &[RecipeItem],
) -> AppResult<Vec<(Ingredient, Decimal)>> {
    let mut cache: HashMap<Uuid, Ingredient> = HashMap::new();
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let ingredient = cached_ingredient(tx, &mut cache, store_id, item.ingredient_id).await?;
        lines.push((ingredient, item.quantity_used));
    }
    Ok(lines)
}

async fn cached_ingredient<T: RepositoryTx>(
    tx: &mut T,
    cache: &mut HashMap<Uuid, Ingredient>,
    store_id: Uuid,
    ingredient_id: Uuid,
) -> AppResult<Ingredient> {
    if let Some(ingredient) = cache.get(&ingredient_id) {
        return Ok(ingredient.clone());
    }
    let ingredient = resolve_ingredient(tx, store_id, ingredient_id).await?;
    cache.insert(ingredient.id, ingredient.clone());
    Ok(ingredient)
}

/// Run the calculator over `(ingredient, quantity_used)` pairs
fn cost_report(
    lines: &[(Ingredient, Decimal)],
    sales_price_per_item: Option<Decimal>,
    production_quantity_per_batch: i32,
) -> (CostBreakdown, RecipeCostReport) {
    let inputs: Vec<CostInput> = lines
        .iter()
        .map(|(ingredient, quantity_used)| CostInput {
            unit_cost: ingredient.unit_cost(),
            quantity_used: *quantity_used,
        })
        .collect();

    let breakdown = calculate_costs(&inputs, sales_price_per_item, production_quantity_per_batch);

    let ingredient_costs = lines
        .iter()
        .zip(&breakdown.lines)
        .map(|((ingredient, quantity_used), line)| IngredientCost {
            ingredient_id: ingredient.id,
            ingredient_name: ingredient.name.clone(),
            unit: ingredient.unit,
            unit_price: ingredient.unit_price(),
            required_amount: *quantity_used,
            cost: line.cost,
            ratio: line.ratio,
        })
        .collect();

    let report = RecipeCostReport {
        ingredient_costs,
        total_material_cost: breakdown.total_material_cost,
        cost_per_item: breakdown.cost_per_item,
        material_ratio: breakdown.material_ratio,
    };

    (breakdown, report)
}
