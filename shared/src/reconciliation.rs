//! Stock reconciliation after retroactive purchase edits
//!
//! When the purchased quantity of an ingredient changes after stock has
//! been handed out, the remaining balance has to be re-derived from what
//! was already used. This module is the single place that decides how.

use rust_decimal::Decimal;
use serde::Serialize;

/// A purchase quantity edit against an existing inventory balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseEdit {
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    /// Quantity before the first edit; marks shrinks below the original purchase
    pub original_stock_before_edit: Option<Decimal>,
    pub remaining_stock: Decimal,
}

impl PurchaseEdit {
    /// Whether the new quantity falls below the originally purchased one
    fn below_original(&self) -> bool {
        let original = match self.original_stock_before_edit {
            Some(snapshot) if !snapshot.is_zero() => snapshot,
            _ => self.previous_quantity,
        };
        self.new_quantity < original
    }
}

/// Outcome of reconciling one purchase edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reconciliation {
    /// Quantity did not change
    Unchanged { remaining_stock: Decimal },
    /// More capacity; the difference is added to the balance
    Grown { remaining_stock: Decimal },
    /// Below the original purchase with nothing used; pending usage is abandoned
    ShrunkUnused { remaining_stock: Decimal },
    /// Less capacity, absorbed by the unused part of the stock
    ShrunkAbsorbed {
        remaining_stock: Decimal,
        used_so_far: Decimal,
    },
    /// Less capacity than already used; the balance floors at zero
    Floored {
        used_so_far: Decimal,
        deficit: Decimal,
    },
}

impl Reconciliation {
    pub fn remaining_stock(&self) -> Decimal {
        match self {
            Reconciliation::Unchanged { remaining_stock }
            | Reconciliation::Grown { remaining_stock }
            | Reconciliation::ShrunkUnused { remaining_stock }
            | Reconciliation::ShrunkAbsorbed {
                remaining_stock, ..
            } => *remaining_stock,
            Reconciliation::Floored { .. } => Decimal::ZERO,
        }
    }

    /// Whether the next line added for this ingredient must be dropped to zero
    pub fn abandons_pending(&self) -> bool {
        matches!(self, Reconciliation::ShrunkUnused { .. })
    }

    /// Whether prior usage accounting no longer fits the capacity
    pub fn is_drift(&self) -> bool {
        matches!(self, Reconciliation::Floored { .. })
    }
}

/// Stock handed out against the capacity in force before the edit, never negative.
///
/// The balance is kept within the current capacity, so usage is measured from
/// the previous quantity. Stock clamped away by an earlier shrink, or a deficit
/// written off by an earlier floor, is never counted again.
pub fn used_so_far(edit: &PurchaseEdit) -> Decimal {
    (edit.previous_quantity - edit.remaining_stock).max(Decimal::ZERO)
}

/// Re-derive the remaining balance for a purchase quantity edit
pub fn reconcile(edit: &PurchaseEdit) -> Reconciliation {
    if edit.new_quantity == edit.previous_quantity {
        return Reconciliation::Unchanged {
            remaining_stock: edit.remaining_stock,
        };
    }

    if edit.new_quantity > edit.previous_quantity {
        return Reconciliation::Grown {
            remaining_stock: edit.remaining_stock + (edit.new_quantity - edit.previous_quantity),
        };
    }

    let used = used_so_far(edit);
    if used.is_zero() && edit.below_original() {
        return Reconciliation::ShrunkUnused {
            remaining_stock: edit.new_quantity,
        };
    }

    let remaining = edit.new_quantity - used;
    if remaining < Decimal::ZERO {
        Reconciliation::Floored {
            used_so_far: used,
            deficit: -remaining,
        }
    } else {
        Reconciliation::ShrunkAbsorbed {
            remaining_stock: remaining,
            used_so_far: used,
        }
    }
}

/// Quantity a newly added recipe line may consume.
///
/// `abandon_pending` is the flag left on the ledger by the last reconciliation
/// (see [`Reconciliation::abandons_pending`]); while it is set the line is
/// stored at zero. Callers clear the flag once it has been applied.
pub fn pending_quantity_used(abandon_pending: bool, requested: Decimal) -> Decimal {
    if abandon_pending {
        Decimal::ZERO
    } else {
        requested
    }
}
