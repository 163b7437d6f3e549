//! Ingredient catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{round_money, Unit};

/// A purchasable ingredient and the price paid for one purchase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub purchase_price: Decimal,
    /// Capacity bought for `purchase_price`, in `unit`
    pub purchase_quantity: Decimal,
    pub unit: Unit,
    pub vendor: Option<String>,
    pub notes: Option<String>,
    /// Purchase quantity before its first edit; written once
    pub original_stock_before_edit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What changed when a purchase was edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseChange {
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    /// Snapshot after the edit (set on the first quantity change)
    pub original_stock_before_edit: Option<Decimal>,
}

impl PurchaseChange {
    pub fn quantity_changed(&self) -> bool {
        self.previous_quantity != self.new_quantity
    }
}

impl Ingredient {
    pub fn new(
        store_id: Uuid,
        name: impl Into<String>,
        purchase_price: Decimal,
        purchase_quantity: Decimal,
        unit: Unit,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            store_id,
            name: name.into(),
            purchase_price,
            purchase_quantity,
            unit,
            vendor: None,
            notes: None,
            original_stock_before_edit: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Cost of a single unit; 0 when nothing was purchased
    pub fn unit_cost(&self) -> Decimal {
        unit_cost(self.purchase_price, self.purchase_quantity)
    }

    /// Unit cost rounded to cents for display
    pub fn unit_price(&self) -> Decimal {
        round_money(self.unit_cost())
    }

    /// Store a new purchase price and quantity.
    ///
    /// The first time the quantity actually changes, the previous quantity is
    /// kept in `original_stock_before_edit`. Later edits leave it alone.
    pub fn update_purchase(&mut self, price: Decimal, quantity: Decimal) -> PurchaseChange {
        let previous_quantity = self.purchase_quantity;

        if quantity != previous_quantity && self.original_stock_before_edit.is_none() {
            self.original_stock_before_edit = Some(previous_quantity);
        }

        self.purchase_price = price;
        self.purchase_quantity = quantity;
        self.updated_at = Utc::now();

        PurchaseChange {
            previous_quantity,
            new_quantity: quantity,
            original_stock_before_edit: self.original_stock_before_edit,
        }
    }
}

/// `price / quantity`, or 0 when `quantity` is 0
pub fn unit_cost(purchase_price: Decimal, purchase_quantity: Decimal) -> Decimal {
    if purchase_quantity.is_zero() {
        Decimal::ZERO
    } else {
        purchase_price / purchase_quantity
    }
}

/// Input for creating an ingredient
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIngredientInput {
    pub name: String,
    pub purchase_price: Decimal,
    pub purchase_quantity: Decimal,
    pub unit: Unit,
    pub vendor: Option<String>,
    pub notes: Option<String>,
}

/// Input for updating an ingredient; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIngredientInput {
    pub name: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub purchase_quantity: Option<Decimal>,
    pub unit: Option<Unit>,
    pub vendor: Option<String>,
    pub notes: Option<String>,
}

impl UpdateIngredientInput {
    pub fn touches_purchase(&self) -> bool {
        self.purchase_price.is_some() || self.purchase_quantity.is_some()
    }
}

/// Ingredient as returned to API clients
#[derive(Debug, Clone, Serialize)]
pub struct IngredientView {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub unit_cost: Decimal,
    pub unit_price: Decimal,
}

impl From<Ingredient> for IngredientView {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            unit_cost: ingredient.unit_cost(),
            unit_price: ingredient.unit_price(),
            ingredient,
        }
    }
}
