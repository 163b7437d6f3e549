//! Recipe and stock ledger tests
//!
//! Tests for recipe lifecycle against the in-memory repository:
//! - Creating then deleting a recipe leaves stock unchanged
//! - Recipe creation is all-or-nothing
//! - Composition replacement only moves stock for changed lines
//! - Stale line quantities are forced to zero once after a capacity shrink
//! - Inventory rows are locked in a fixed order
//! - Concurrent reservations never oversell

use livflow_backend::error::AppError;
use livflow_backend::repository::MemoryRepository;
use livflow_backend::services::{IngredientService, InventoryService, RecipeService};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    CostPreviewInput, CostPreviewLine, CreateIngredientInput, CreateRecipeInput, Reconciliation, RecipeLineInput,
    Unit, UpdateIngredientInput, UpdateRecipeInput,
};
use uuid::Uuid;

// ============================================================================
// Fixtures
// ============================================================================

struct Services {
    store_id: Uuid,
    ingredients: IngredientService<MemoryRepository>,
    recipes: RecipeService<MemoryRepository>,
    inventory: InventoryService<MemoryRepository>,
}

fn services() -> Services {
    let repo = MemoryRepository::new();
    Services {
        store_id: Uuid::new_v4(),
        ingredients: IngredientService::with_repository(repo.clone()),
        recipes: RecipeService::with_repository(repo.clone()),
        inventory: InventoryService::with_repository(repo),
    }
}

impl Services {
    async fn ingredient(&self, name: &str, price: Decimal, quantity: Decimal) -> Uuid {
        let input = CreateIngredientInput {
            name: name.to_string(),
            purchase_price: price,
            purchase_quantity: quantity,
            unit: Unit::Mass,
            vendor: None,
            notes: None,
        };
        self.ingredients.create(self.store_id, input).await.unwrap().ingredient.id
    }

    async fn stock(&self, ingredient_id: Uuid) -> Decimal {
        self.inventory
            .get(self.store_id, ingredient_id)
            .await
            .unwrap()
            .remaining_stock
    }
}

fn line(ingredient_id: Uuid, quantity_used: Decimal) -> RecipeLineInput {
    RecipeLineInput {
        ingredient_id,
        quantity_used,
        unit: None,
    }
}

fn recipe(name: &str, sales_price: Option<Decimal>, batch: i32, items: Vec<RecipeLineInput>) -> CreateRecipeInput {
    CreateRecipeInput {
        name: name.to_string(),
        sales_price_per_item: sales_price,
        production_quantity_per_batch: batch,
        is_favorite: None,
        items,
    }
}

fn replace_items(items: Vec<RecipeLineInput>) -> UpdateRecipeInput {
    UpdateRecipeInput {
        items: Some(items),
        ..Default::default()
    }
}

// ============================================================================
// Creation and Costing
// ============================================================================

#[tokio::test]
async fn test_create_reserves_stock_and_caches_costs() {
    let s = services();
    let flour = s.ingredient("Flour", dec!(1000), dec!(1000)).await;
    let butter = s.ingredient("Butter", dec!(500), dec!(500)).await;

    let detail = s
        .recipes
        .create(
            s.store_id,
            recipe("Croissant", Some(dec!(100)), 5, vec![line(flour, dec!(200)), line(butter, dec!(100))]),
        )
        .await
        .unwrap();

    assert_eq!(detail.recipe.total_material_cost, dec!(300));
    assert_eq!(detail.recipe.cost_per_item, dec!(60));
    assert_eq!(detail.recipe.material_ratio, dec!(0.6));
    assert_eq!(detail.costs.ingredient_costs.len(), 2);
    assert_eq!(detail.costs.ingredient_costs[0].cost, dec!(200));
    assert_eq!(detail.costs.ingredient_costs[0].ratio, dec!(0.67));
    assert_eq!(detail.items[1].position, 1);

    assert_eq!(s.stock(flour).await, dec!(800));
    assert_eq!(s.stock(butter).await, dec!(400));
}

#[tokio::test]
async fn test_non_positive_batch_is_normalized() {
    let s = services();
    let sugar = s.ingredient("Sugar", dec!(100), dec!(100)).await;

    let detail = s
        .recipes
        .create(s.store_id, recipe("Syrup", Some(dec!(0)), 0, vec![line(sugar, dec!(30))]))
        .await
        .unwrap();

    assert_eq!(detail.recipe.production_quantity_per_batch, 1);
    assert_eq!(detail.recipe.cost_per_item, dec!(30));
    assert_eq!(detail.recipe.material_ratio, Decimal::ZERO);
}

#[tokio::test]
async fn test_create_is_all_or_nothing_on_insufficient_stock() {
    let s = services();
    let flour = s.ingredient("Flour", dec!(1000), dec!(100)).await;
    let butter = s.ingredient("Butter", dec!(500), dec!(5)).await;

    let err = s
        .recipes
        .create(s.store_id, recipe("Brioche", None, 1, vec![line(flour, dec!(50)), line(butter, dec!(8))]))
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientStock {
            ingredient_id,
            requested,
            available,
            ..
        } => {
            assert_eq!(ingredient_id, butter);
            assert_eq!(requested, dec!(8));
            assert_eq!(available, dec!(5));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(s.stock(flour).await, dec!(100));
    assert_eq!(s.stock(butter).await, dec!(5));
    assert!(s.recipes.list(s.store_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_unknown_ingredient() {
    let s = services();
    let flour = s.ingredient("Flour", dec!(1000), dec!(100)).await;

    let err = s
        .recipes
        .create(s.store_id, recipe("Bread", None, 1, vec![line(flour, dec!(10)), line(Uuid::new_v4(), dec!(1))]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(s.stock(flour).await, dec!(100));
}

#[tokio::test]
async fn test_ingredients_are_scoped_to_their_store() {
    let s = services();
    let flour = s.ingredient("Flour", dec!(1000), dec!(100)).await;

    let err = s
        .recipes
        .create(Uuid::new_v4(), recipe("Bread", None, 1, vec![line(flour, dec!(10))]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_create_then_delete_restores_stock() {
    let s = services();
    let flour = s.ingredient("Flour", dec!(1000), dec!(100)).await;

    let detail = s
        .recipes
        .create(s.store_id, recipe("Bread", None, 1, vec![line(flour, dec!(40)), line(flour, dec!(15))]))
        .await
        .unwrap();
    assert_eq!(s.stock(flour).await, dec!(45));

    s.recipes.delete(s.store_id, detail.recipe.id).await.unwrap();

    assert_eq!(s.stock(flour).await, dec!(100));
    let err = s.recipes.get(s.store_id, detail.recipe.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============================================================================
// Composition Replacement
// ============================================================================

#[tokio::test]
async fn test_replace_moves_stock_only_for_changed_lines() {
    let s = services();
    let flour = s.ingredient("Flour", dec!(1000), dec!(100)).await;
    let sugar = s.ingredient("Sugar", dec!(200), dec!(50)).await;

    let detail = s
        .recipes
        .create(s.store_id, recipe("Cake", None, 1, vec![line(flour, dec!(10)), line(sugar, dec!(5))]))
        .await
        .unwrap();
    let id = detail.recipe.id;

    s.recipes
        .update(s.store_id, id, replace_items(vec![line(flour, dec!(10)), line(sugar, dec!(8))]))
        .await
        .unwrap();
    assert_eq!(s.stock(flour).await, dec!(90));
    assert_eq!(s.stock(sugar).await, dec!(42));

    let updated = s
        .recipes
        .update(s.store_id, id, replace_items(vec![line(sugar, dec!(8))]))
        .await
        .unwrap();
    assert_eq!(s.stock(flour).await, dec!(100));
    assert_eq!(s.stock(sugar).await, dec!(42));

    assert_eq!(updated.items.len(), 1);
    assert_eq!(updated.recipe.total_material_cost, dec!(32));
}

#[tokio::test]
async fn test_replace_restores_before_reserving() {
    let s = services();
    let cream = s.ingredient("Cream", dec!(100), dec!(10)).await;

    let detail = s
        .recipes
        .create(s.store_id, recipe("Mousse", None, 1, vec![line(cream, dec!(10))]))
        .await
        .unwrap();
    assert_eq!(s.stock(cream).await, Decimal::ZERO);

    s.recipes
        .update(s.store_id, detail.recipe.id, replace_items(vec![line(cream, dec!(6))]))
        .await
        .unwrap();

    assert_eq!(s.stock(cream).await, dec!(4));
}

#[tokio::test]
async fn test_failed_replace_rolls_back() {
    let s = services();
    let flour = s.ingredient("Flour", dec!(1000), dec!(100)).await;
    let saffron = s.ingredient("Saffron", dec!(9000), dec!(2)).await;

    let detail = s
        .recipes
        .create(s.store_id, recipe("Bread", None, 1, vec![line(flour, dec!(10))]))
        .await
        .unwrap();

    let err = s
        .recipes
        .update(
            s.store_id,
            detail.recipe.id,
            UpdateRecipeInput {
                name: Some("Saffron bread".to_string()),
                items: Some(vec![line(flour, dec!(20)), line(saffron, dec!(3))]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    let current = s.recipes.get(s.store_id, detail.recipe.id).await.unwrap();
    assert_eq!(current.recipe.name, "Bread");
    assert_eq!(current.items.len(), 1);
    assert_eq!(current.items[0].quantity_used, dec!(10));
    assert_eq!(s.stock(flour).await, dec!(90));
    assert_eq!(s.stock(saffron).await, dec!(2));
}

async fn shrink_butter_unused(s: &Services) -> Uuid {
    let butter = s.ingredient("Butter", dec!(5000), dec!(100)).await;

    let shrink = s
        .ingredients
        .update(
            s.store_id,
            butter,
            UpdateIngredientInput {
                purchase_quantity: Some(dec!(40)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        shrink.stock_reconciliation,
        Some(Reconciliation::ShrunkUnused {
            remaining_stock: dec!(40)
        })
    );
    assert_eq!(shrink.ingredient.ingredient.original_stock_before_edit, Some(dec!(100)));

    butter
}

#[tokio::test]
async fn test_capacity_shrink_forces_next_added_line_to_zero_once() {
    let s = services();
    let butter = shrink_butter_unused(&s).await;

    let detail = s
        .recipes
        .create(s.store_id, recipe("Shortbread", None, 1, vec![]))
        .await
        .unwrap();

    let updated = s
        .recipes
        .update(s.store_id, detail.recipe.id, replace_items(vec![line(butter, dec!(10))]))
        .await
        .unwrap();
    assert_eq!(updated.items[0].quantity_used, Decimal::ZERO);
    assert_eq!(updated.recipe.total_material_cost, Decimal::ZERO);
    assert_eq!(s.stock(butter).await, dec!(40));

    // The abandoned quantity was dropped; the next edit reserves normally
    let updated = s
        .recipes
        .update(s.store_id, detail.recipe.id, replace_items(vec![line(butter, dec!(10))]))
        .await
        .unwrap();
    assert_eq!(updated.items[0].quantity_used, dec!(10));
    assert_eq!(updated.recipe.total_material_cost, dec!(1250));
    assert_eq!(s.stock(butter).await, dec!(30));

    let updated = s
        .recipes
        .update(s.store_id, detail.recipe.id, replace_items(vec![line(butter, dec!(10)), line(butter, dec!(5))]))
        .await
        .unwrap();
    assert_eq!(updated.items[1].quantity_used, dec!(5));
    assert_eq!(s.stock(butter).await, dec!(25));
}

#[tokio::test]
async fn test_same_replace_drops_every_added_line_of_abandoned_ingredient() {
    let s = services();
    let butter = shrink_butter_unused(&s).await;
    let detail = s
        .recipes
        .create(s.store_id, recipe("Shortbread", None, 1, vec![]))
        .await
        .unwrap();

    let updated = s
        .recipes
        .update(s.store_id, detail.recipe.id, replace_items(vec![line(butter, dec!(10)), line(butter, dec!(5))]))
        .await
        .unwrap();

    assert!(updated.items.iter().all(|item| item.quantity_used.is_zero()));
    assert_eq!(s.stock(butter).await, dec!(40));
}

#[tokio::test]
async fn test_consumption_clears_abandoned_usage() {
    let s = services();
    let butter = shrink_butter_unused(&s).await;

    // New recipes reserve in full and consume the stock
    let created = s
        .recipes
        .create(s.store_id, recipe("Butter cookie", None, 1, vec![line(butter, dec!(10))]))
        .await
        .unwrap();
    assert_eq!(created.items[0].quantity_used, dec!(10));
    assert_eq!(s.stock(butter).await, dec!(30));

    let other = s
        .recipes
        .create(s.store_id, recipe("Shortbread", None, 1, vec![]))
        .await
        .unwrap();
    let updated = s
        .recipes
        .update(s.store_id, other.recipe.id, replace_items(vec![line(butter, dec!(5))]))
        .await
        .unwrap();
    assert_eq!(updated.items[0].quantity_used, dec!(5));
    assert_eq!(s.stock(butter).await, dec!(25));
}

#[tokio::test]
async fn test_direct_use_clears_abandoned_usage() {
    let s = services();
    let butter = shrink_butter_unused(&s).await;
    s.inventory.use_direct(s.store_id, butter, dec!(2)).await.unwrap();

    let detail = s
        .recipes
        .create(s.store_id, recipe("Shortbread", None, 1, vec![]))
        .await
        .unwrap();
    let updated = s
        .recipes
        .update(s.store_id, detail.recipe.id, replace_items(vec![line(butter, dec!(10))]))
        .await
        .unwrap();

    assert_eq!(updated.items[0].quantity_used, dec!(10));
    assert_eq!(s.stock(butter).await, dec!(28));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_recipes_with_opposite_line_order() {
    let s = services();
    let flour = s.ingredient("Flour", dec!(1000), dec!(100)).await;
    let sugar = s.ingredient("Sugar", dec!(500), dec!(100)).await;

    let first = tokio::spawn({
        let recipes = s.recipes.clone();
        let input = recipe("Cake", None, 1, vec![line(flour, dec!(10)), line(sugar, dec!(20))]);
        let store_id = s.store_id;
        async move { recipes.create(store_id, input).await }
    });
    let second = tokio::spawn({
        let recipes = s.recipes.clone();
        let input = recipe("Tart", None, 1, vec![line(sugar, dec!(5)), line(flour, dec!(15))]);
        let store_id = s.store_id;
        async move { recipes.create(store_id, input).await }
    });

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(s.stock(flour).await, dec!(75));
    assert_eq!(s.stock(sugar).await, dec!(75));
}

// ============================================================================
// Favorites, Listing and Preview
// ============================================================================

#[tokio::test]
async fn test_favorites_are_listed_first() {
    let s = services();
    let apple = s.recipes.create(s.store_id, recipe("Apple pie", None, 1, vec![])).await.unwrap();
    s.recipes.create(s.store_id, recipe("Banana bread", None, 1, vec![])).await.unwrap();

    let favorite = s
        .recipes
        .set_favorite(s.store_id, apple.recipe.id, false)
        .await
        .unwrap();
    assert!(!favorite.is_favorite);

    let names: Vec<String> = s.recipes.list(s.store_id).await.unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Apple pie", "Banana bread"]);

    let banana = s.recipes.list(s.store_id).await.unwrap()[1].id;
    s.recipes.set_favorite(s.store_id, banana, true).await.unwrap();

    let names: Vec<String> = s.recipes.list(s.store_id).await.unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Banana bread", "Apple pie"]);
}

#[tokio::test]
async fn test_preview_costs_moves_no_stock() {
    let s = services();
    let flour = s.ingredient("Flour", dec!(1000), dec!(1000)).await;
    let butter = s.ingredient("Butter", dec!(500), dec!(500)).await;

    let report = s
        .recipes
        .preview_costs(
            s.store_id,
            CostPreviewInput {
                sales_price_per_item: Some(dec!(100)),
                production_quantity_per_batch: 5,
                items: vec![
                    CostPreviewLine {
                        ingredient_id: flour,
                        quantity_used: dec!(200),
                    },
                    CostPreviewLine {
                        ingredient_id: butter,
                        quantity_used: dec!(100),
                    },
                ],
            },
        )
        .await
        .unwrap();

    assert_eq!(report.total_material_cost, dec!(300));
    assert_eq!(report.cost_per_item, dec!(60));
    assert_eq!(report.material_ratio, dec!(0.6));
    assert_eq!(report.ingredient_costs[1].ingredient_name, "Butter");
    assert_eq!(report.ingredient_costs[1].unit_price, dec!(1));
    assert_eq!(s.stock(flour).await, dec!(1000));
}

// ============================================================================
// Direct Stock Movements
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_reservations_never_oversell() {
    let s = services();
    let milk = s.ingredient("Milk", dec!(30), dec!(10)).await;

    let first = tokio::spawn({
        let inventory = s.inventory.clone();
        let store_id = s.store_id;
        async move { inventory.use_direct(store_id, milk, dec!(6)).await }
    });
    let second = tokio::spawn({
        let inventory = s.inventory.clone();
        let store_id = s.store_id;
        async move { inventory.use_direct(store_id, milk, dec!(6)).await }
    });

    let results = [first.await.unwrap(), second.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let failures = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::InsufficientStock { .. })))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(failures, 1);
    assert_eq!(s.stock(milk).await, dec!(4));
}

#[tokio::test]
async fn test_restore_is_capped_at_purchase_quantity() {
    let s = services();
    let milk = s.ingredient("Milk", dec!(30), dec!(10)).await;

    s.inventory.use_direct(s.store_id, milk, dec!(3)).await.unwrap();
    let snapshot = s.inventory.restore(s.store_id, milk, dec!(10)).await.unwrap();

    assert_eq!(snapshot.remaining_stock, dec!(10));
}

#[tokio::test]
async fn test_direct_use_rejects_non_positive_amounts() {
    let s = services();
    let milk = s.ingredient("Milk", dec!(30), dec!(10)).await;

    for amount in [Decimal::ZERO, dec!(-1), dec!(0.00001)] {
        let err = s.inventory.use_direct(s.store_id, milk, amount).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
    assert_eq!(s.stock(milk).await, dec!(10));
}

#[tokio::test]
async fn test_inventory_snapshot_lists_every_ingredient() {
    let s = services();
    let flour = s.ingredient("Flour", dec!(1000), dec!(100)).await;
    s.ingredient("Almond", dec!(800), dec!(40)).await;

    let snapshots = s.inventory.list(s.store_id).await.unwrap();

    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].ingredient_name, "Almond");
    assert_eq!(snapshots[0].unit_cost, dec!(20));
    assert_eq!(snapshots[1].ingredient_id, flour);
    assert_eq!(snapshots[1].remaining_stock, dec!(100));
}

// ============================================================================
// Property Tests
// ============================================================================

mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_create_then_delete_is_stock_neutral(
            quantities in prop::collection::vec(1i64..=5_000i64, 1..6),
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let s = services();
                let flour = s.ingredient("Flour", dec!(1000), dec!(10000)).await;

                let lines: Vec<RecipeLineInput> = quantities
                    .iter()
                    .map(|q| line(flour, Decimal::new(*q, 1)))
                    .collect();
                let used: Decimal = lines.iter().map(|l| l.quantity_used).sum();

                let created = s.recipes.create(s.store_id, recipe("Bread", None, 1, lines)).await;
                match created {
                    Ok(detail) => {
                        assert_eq!(s.stock(flour).await, dec!(10000) - used);
                        s.recipes.delete(s.store_id, detail.recipe.id).await.unwrap();
                    }
                    Err(err) => assert!(matches!(err, AppError::InsufficientStock { .. })),
                }

                assert_eq!(s.stock(flour).await, dec!(10000));
            });
        }
    }
}
