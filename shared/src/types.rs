//! Common types used across the platform

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept for money, costs and ratios
pub const MONEY_DP: u32 = 2;

/// Round half-up (midpoint away from zero) to `dp` decimal places.
///
/// Every rounded figure the calculator produces goes through here so the
/// rounding mode is the same everywhere.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a money amount to cents
pub fn round_money(value: Decimal) -> Decimal {
    round_half_up(value, MONEY_DP)
}

/// Purchase unit of an ingredient
///
/// Units are informational: quantities are never converted between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Mass, in milligrams
    #[serde(rename = "mg")]
    Mass,
    /// Volume, in millilitres
    #[serde(rename = "ml")]
    Volume,
    /// Countable pieces
    #[serde(rename = "ea")]
    Count,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Mass => "mg",
            Unit::Volume => "ml",
            Unit::Count => "ea",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "mg" => Some(Unit::Mass),
            "ml" => Some(Unit::Volume),
            "ea" => Some(Unit::Count),
            _ => None,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
