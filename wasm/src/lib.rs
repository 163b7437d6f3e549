//! WebAssembly module for the Livflow back-office
//!
//! Provides client-side computation for:
//! - Recipe cost previews while a composition is being edited
//! - Ingredient unit costs
//! - Form validation before submission

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::costing::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Composition as edited in the browser
#[derive(Debug, Clone, Deserialize)]
pub struct CostRequest {
    pub sales_price_per_item: Option<Decimal>,
    pub production_quantity_per_batch: i32,
    pub lines: Vec<CostInput>,
}

/// Validation outcome for one form field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCheck {
    pub valid: bool,
    pub message: Option<String>,
}

impl From<Result<(), &'static str>> for FieldCheck {
    fn from(result: Result<(), &'static str>) -> Self {
        match result {
            Ok(()) => Self {
                valid: true,
                message: None,
            },
            Err(message) => Self {
                valid: false,
                message: Some(message.to_string()),
            },
        }
    }
}

fn report_error(message: String) -> JsValue {
    web_sys::console::error_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}

/// Cost breakdown for a composition, as JSON
pub fn cost_breakdown_json(request_json: &str) -> Result<String, String> {
    let request: CostRequest =
        serde_json::from_str(request_json).map_err(|e| format!("Invalid cost request JSON: {}", e))?;

    let breakdown = calculate_costs(
        &request.lines,
        request.sales_price_per_item,
        request.production_quantity_per_batch,
    );

    serde_json::to_string(&breakdown).map_err(|e| format!("Failed to encode breakdown: {}", e))
}

/// Unit cost of a purchase, rounded to cents; 0 when nothing was bought
pub fn unit_price_of(purchase_price: &str, purchase_quantity: &str) -> Result<String, String> {
    let price: Decimal = purchase_price
        .parse()
        .map_err(|e| format!("Invalid purchase price '{}': {}", purchase_price, e))?;
    let quantity: Decimal = purchase_quantity
        .parse()
        .map_err(|e| format!("Invalid purchase quantity '{}': {}", purchase_quantity, e))?;

    Ok(round_money(shared::unit_cost(price, quantity)).to_string())
}

/// Calculate recipe costs from a JSON composition
#[wasm_bindgen]
pub fn calculate_recipe_cost(request_json: &str) -> Result<String, JsValue> {
    cost_breakdown_json(request_json).map_err(report_error)
}

/// Calculate the unit price of an ingredient purchase
#[wasm_bindgen]
pub fn calculate_unit_price(purchase_price: &str, purchase_quantity: &str) -> Result<String, JsValue> {
    unit_price_of(purchase_price, purchase_quantity).map_err(report_error)
}

/// Check an ingredient or recipe name
#[wasm_bindgen]
pub fn check_name(name: &str) -> JsValue {
    let check = FieldCheck::from(validate_name(name));
    JsValue::from_str(&serde_json::to_string(&check).unwrap_or_default())
}
