//! Recipe cost calculator
//!
//! Pure functions turning a bill of materials, ingredient unit costs and a
//! sales price into material cost figures. All rounding is half-up to cents
//! and happens per line before summing, so totals are reproducible to the
//! penny.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::round_money;

/// One line fed into the calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostInput {
    pub unit_cost: Decimal,
    pub quantity_used: Decimal,
}

/// Calculator output for one line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCost {
    pub unit_cost: Decimal,
    pub quantity_used: Decimal,
    /// `quantity_used * unit_cost`, rounded
    pub cost: Decimal,
    /// Share of the total material cost, rounded
    pub ratio: Decimal,
}

/// Calculator output for a whole composition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub lines: Vec<LineCost>,
    pub total_material_cost: Decimal,
    pub cost_per_item: Decimal,
    pub material_ratio: Decimal,
}

/// Batch sizes below 1 are treated as 1
pub fn effective_batch_size(production_quantity_per_batch: i32) -> i32 {
    production_quantity_per_batch.max(1)
}

/// Calculate material costs for a composition
pub fn calculate_costs(
    lines: &[CostInput],
    sales_price_per_item: Option<Decimal>,
    production_quantity_per_batch: i32,
) -> CostBreakdown {
    let line_costs: Vec<Decimal> = lines
        .iter()
        .map(|line| round_money(line.quantity_used * line.unit_cost))
        .collect();

    let total_material_cost: Decimal = line_costs.iter().copied().sum();

    let batch = Decimal::from(effective_batch_size(production_quantity_per_batch));
    let cost_per_item = round_money(total_material_cost / batch);

    let material_ratio = match sales_price_per_item {
        Some(price) => {
            let revenue = price * batch;
            if revenue.is_zero() {
                Decimal::ZERO
            } else {
                round_money(total_material_cost / revenue)
            }
        }
        None => Decimal::ZERO,
    };

    let lines = lines
        .iter()
        .zip(line_costs)
        .map(|(line, cost)| LineCost {
            unit_cost: line.unit_cost,
            quantity_used: line.quantity_used,
            cost,
            ratio: line_ratio(cost, total_material_cost),
        })
        .collect();

    CostBreakdown {
        lines,
        total_material_cost,
        cost_per_item,
        material_ratio,
    }
}

fn line_ratio(cost: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        Decimal::ZERO
    } else {
        round_money(cost / total)
    }
}
