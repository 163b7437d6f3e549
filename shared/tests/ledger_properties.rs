//! Stock ledger and costing property tests
//!
//! Tests for:
//! - Unit cost never divides by zero
//! - Reservations never drive stock negative
//! - Restoration never exceeds the purchase quantity
//! - Reconciliation never produces a negative balance
//! - Quantity edits never lose stock nobody used

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    calculate_costs, reconcile, round_money, unit_cost, CostInput, InventoryRecord, PurchaseEdit,
};
use uuid::Uuid;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Quantities from 0.00 to 10000.00
fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Positive quantities from 0.01 to 10000.00
fn positive_quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Prices from 0.00 to 100000.00
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn record(stock: Decimal) -> InventoryRecord {
    InventoryRecord {
        ingredient_id: Uuid::new_v4(),
        remaining_stock: stock,
        abandon_pending: false,
        updated_at: Utc::now(),
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_unit_cost_matches_division(price in price_strategy(), quantity in quantity_strategy()) {
        let cost = unit_cost(price, quantity);
        if quantity.is_zero() {
            prop_assert_eq!(cost, Decimal::ZERO);
        } else {
            prop_assert_eq!(round_money(cost), round_money(price / quantity));
        }
    }

    #[test]
    fn prop_reservations_never_go_negative(
        start in quantity_strategy(),
        requests in prop::collection::vec(positive_quantity_strategy(), 1..20),
    ) {
        let mut inv = record(start);
        for amount in requests {
            let before = inv.remaining_stock;
            match inv.reserve(amount) {
                Ok(after) => prop_assert_eq!(after, before - amount),
                Err(err) => {
                    prop_assert_eq!(inv.remaining_stock, before);
                    prop_assert_eq!(err.shortfall(), amount - before);
                }
            }
            prop_assert!(inv.remaining_stock >= Decimal::ZERO);
        }
    }

    #[test]
    fn prop_restore_is_capped(
        capacity in positive_quantity_strategy(),
        stock_share in 0u32..=100u32,
        amount in quantity_strategy(),
    ) {
        let stock = round_money(capacity * Decimal::from(stock_share) / Decimal::from(100));
        let mut inv = record(stock.min(capacity));
        let after = inv.restore(amount, capacity);
        prop_assert!(after <= capacity);
        prop_assert!(after >= stock.min(capacity));
    }

    #[test]
    fn prop_reserve_then_restore_is_identity(
        capacity in positive_quantity_strategy(),
        share in 0u32..=100u32,
    ) {
        let amount = round_money(capacity * Decimal::from(share) / Decimal::from(100)).min(capacity);
        let mut inv = record(capacity);
        inv.reserve(amount).unwrap();
        inv.restore(amount, capacity);
        prop_assert_eq!(inv.remaining_stock, capacity);
    }

    #[test]
    fn prop_reconciliation_never_negative(
        previous in positive_quantity_strategy(),
        new in positive_quantity_strategy(),
        used_share in 0u32..=100u32,
    ) {
        let used = round_money(previous * Decimal::from(used_share) / Decimal::from(100)).min(previous);
        let edit = PurchaseEdit {
            previous_quantity: previous,
            new_quantity: new,
            original_stock_before_edit: Some(previous),
            remaining_stock: previous - used,
        };
        let outcome = reconcile(&edit);
        prop_assert!(outcome.remaining_stock() >= Decimal::ZERO);
        prop_assert!(outcome.remaining_stock() <= new);
    }

    #[test]
    fn prop_untouched_stock_follows_quantity_edits(
        purchased in positive_quantity_strategy(),
        edits in prop::collection::vec(positive_quantity_strategy(), 1..8),
    ) {
        let mut previous = purchased;
        let mut remaining = purchased;
        for quantity in edits {
            let outcome = reconcile(&PurchaseEdit {
                previous_quantity: previous,
                new_quantity: quantity,
                original_stock_before_edit: Some(purchased),
                remaining_stock: remaining,
            });
            prop_assert!(!outcome.is_drift());
            prop_assert_eq!(outcome.remaining_stock(), quantity);
            previous = quantity;
            remaining = outcome.remaining_stock();
        }
    }

    #[test]
    fn prop_total_is_sum_of_rounded_lines(
        lines in prop::collection::vec((price_strategy(), positive_quantity_strategy()), 0..10),
        batch in -5i32..50i32,
    ) {
        let inputs: Vec<CostInput> = lines
            .iter()
            .map(|(unit_cost, quantity_used)| CostInput { unit_cost: *unit_cost, quantity_used: *quantity_used })
            .collect();
        let costs = calculate_costs(&inputs, Some(Decimal::ONE), batch);

        let expected: Decimal = inputs.iter().map(|l| round_money(l.unit_cost * l.quantity_used)).sum();
        prop_assert_eq!(costs.total_material_cost, expected);
        prop_assert_eq!(
            costs.cost_per_item,
            round_money(expected / Decimal::from(batch.max(1)))
        );
    }
}
