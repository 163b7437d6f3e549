//! Stock ledger errors raised by the pure domain types

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors from stock movements on a single inventory record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("Insufficient stock for ingredient {ingredient_id}: requested {requested}, available {available}")]
    InsufficientStock {
        ingredient_id: Uuid,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Stock amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
}

impl StockError {
    /// How much stock is missing to satisfy the request (0 for other errors)
    pub fn shortfall(&self) -> Decimal {
        match self {
            StockError::InsufficientStock {
                requested,
                available,
                ..
            } => (*requested - *available).max(Decimal::ZERO),
            StockError::NonPositiveAmount(_) => Decimal::ZERO,
        }
    }
}
