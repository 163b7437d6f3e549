//! Inventory ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Ingredient;
use crate::error::StockError;
use crate::types::Unit;

/// Running stock balance of one ingredient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryRecord {
    pub ingredient_id: Uuid,
    pub remaining_stock: Decimal,
    /// Set by a shrink that found nothing used; the next line added for the
    /// ingredient is stored at zero. Cleared by that line or by any consumption.
    #[serde(default)]
    pub abandon_pending: bool,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// Fresh record holding the whole purchase
    pub fn seeded(ingredient: &Ingredient) -> Self {
        Self {
            ingredient_id: ingredient.id,
            remaining_stock: ingredient.purchase_quantity,
            abandon_pending: false,
            updated_at: Utc::now(),
        }
    }

    /// Subtract `amount` if that much is left; leaves the balance untouched otherwise
    pub fn reserve(&mut self, amount: Decimal) -> Result<Decimal, StockError> {
        if amount > self.remaining_stock {
            return Err(StockError::InsufficientStock {
                ingredient_id: self.ingredient_id,
                requested: amount,
                available: self.remaining_stock,
            });
        }
        self.remaining_stock -= amount;
        self.abandon_pending = false;
        self.updated_at = Utc::now();
        Ok(self.remaining_stock)
    }

    /// Add `amount` back without exceeding `capacity`
    pub fn restore(&mut self, amount: Decimal, capacity: Decimal) -> Decimal {
        self.remaining_stock = (self.remaining_stock + amount).min(capacity);
        self.updated_at = Utc::now();
        self.remaining_stock
    }
}

/// Inventory row as reported to collaborators
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventorySnapshot {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub remaining_stock: Decimal,
    pub unit: Unit,
    pub unit_cost: Decimal,
}

impl InventorySnapshot {
    pub fn new(ingredient: &Ingredient, record: &InventoryRecord) -> Self {
        Self {
            ingredient_id: ingredient.id,
            ingredient_name: ingredient.name.clone(),
            remaining_stock: record.remaining_stock,
            unit: ingredient.unit,
            unit_cost: ingredient.unit_cost(),
        }
    }
}

/// Input for direct stock usage (`used_stock`) outside any recipe
#[derive(Debug, Clone, Deserialize)]
pub struct UseStockInput {
    pub used_stock: Decimal,
}

/// Input for direct stock restoration outside any recipe
#[derive(Debug, Clone, Deserialize)]
pub struct RestoreStockInput {
    pub amount: Decimal,
}
