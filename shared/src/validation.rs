//! Validation utilities for the Livflow back-office

use rust_decimal::Decimal;

use crate::models::{CreateIngredientInput, Ingredient, RecipeLineInput};
use crate::types::{Unit, MONEY_DP};

/// Longest accepted ingredient or recipe name
pub const MAX_NAME_LENGTH: usize = 100;

/// Longest accepted vendor name
pub const MAX_VENDOR_LENGTH: usize = 100;

/// Decimal places stored for quantities and stock
pub const QUANTITY_SCALE: u32 = 4;

/// Largest storable price, 9,999,999,999.99
pub fn max_money() -> Decimal {
    Decimal::new(999_999_999_999, MONEY_DP)
}

/// Largest storable quantity, 9,999,999,999.9999
pub fn max_quantity() -> Decimal {
    Decimal::new(99_999_999_999_999, QUANTITY_SCALE)
}

fn decimal_places(value: Decimal) -> u32 {
    value.normalize().scale()
}

// ============================================================================
// Precision Validations
// ============================================================================

/// Validate that a price fits the stored precision
pub fn validate_money_precision(amount: Decimal) -> Result<(), &'static str> {
    if decimal_places(amount) > MONEY_DP {
        return Err("Prices can have at most 2 decimal places");
    }
    if amount.abs() > max_money() {
        return Err("Price is too large");
    }
    Ok(())
}

/// Validate that a quantity fits the stored precision
pub fn validate_quantity_precision(quantity: Decimal) -> Result<(), &'static str> {
    if decimal_places(quantity) > QUANTITY_SCALE {
        return Err("Quantities can have at most 4 decimal places");
    }
    if quantity.abs() > max_quantity() {
        return Err("Quantity is too large");
    }
    Ok(())
}

// ============================================================================
// Catalog Validations
// ============================================================================

/// Validate an ingredient or recipe name
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name cannot be empty");
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err("Name must be at most 100 characters");
    }
    Ok(())
}

/// Validate a purchase price (money, zero allowed)
pub fn validate_purchase_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Purchase price cannot be negative");
    }
    validate_money_precision(price)
}

/// Validate a purchase quantity (capacity bought)
pub fn validate_purchase_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Purchase quantity must be positive");
    }
    validate_quantity_precision(quantity)
}

/// Validate an optional vendor name
pub fn validate_vendor(vendor: Option<&str>) -> Result<(), &'static str> {
    match vendor {
        Some(v) if v.chars().count() > MAX_VENDOR_LENGTH => {
            Err("Vendor must be at most 100 characters")
        }
        _ => Ok(()),
    }
}

/// Validate a new ingredient, returning the offending field on failure
pub fn validate_new_ingredient(
    input: &CreateIngredientInput,
) -> Result<(), (&'static str, &'static str)> {
    validate_name(&input.name).map_err(|e| ("name", e))?;
    validate_purchase_price(input.purchase_price).map_err(|e| ("purchase_price", e))?;
    validate_purchase_quantity(input.purchase_quantity).map_err(|e| ("purchase_quantity", e))?;
    validate_vendor(input.vendor.as_deref()).map_err(|e| ("vendor", e))?;
    Ok(())
}

// ============================================================================
// Recipe Validations
// ============================================================================

/// Validate an optional sales price per item
pub fn validate_sales_price(price: Option<Decimal>) -> Result<(), &'static str> {
    match price {
        Some(p) if p < Decimal::ZERO => Err("Sales price cannot be negative"),
        Some(p) => validate_money_precision(p),
        None => Ok(()),
    }
}

/// Validate the quantity a recipe line consumes
pub fn validate_quantity_used(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity used must be positive");
    }
    validate_quantity_precision(quantity)
}

/// Resolve the unit of a recipe line against its ingredient.
///
/// Units are never converted, so a line must use the ingredient's unit.
pub fn resolve_line_unit(line: &RecipeLineInput, ingredient: &Ingredient) -> Result<Unit, &'static str> {
    match line.unit {
        None => Ok(ingredient.unit),
        Some(unit) if unit == ingredient.unit => Ok(unit),
        Some(_) => Err("Line unit must match the ingredient unit"),
    }
}
