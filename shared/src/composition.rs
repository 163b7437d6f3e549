//! Bill-of-materials composition diffing

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::RecipeItem;
use crate::types::Unit;

/// The stock-relevant part of a composition line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionLine {
    pub ingredient_id: Uuid,
    pub quantity_used: Decimal,
    pub unit: Unit,
}

impl From<&RecipeItem> for CompositionLine {
    fn from(item: &RecipeItem) -> Self {
        Self {
            ingredient_id: item.ingredient_id,
            quantity_used: item.quantity_used,
            unit: item.unit,
        }
    }
}

/// Multiset symmetric difference between two compositions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionDiff {
    /// Indices into the current composition whose stock goes back
    pub removed: Vec<usize>,
    /// Indices into the next composition that need fresh stock
    pub added: Vec<usize>,
    /// `(current, next)` index pairs that move no stock
    pub kept: Vec<(usize, usize)>,
}

impl CompositionDiff {
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Match identical lines pairwise; everything unmatched is removed or added.
///
/// Duplicate lines count separately, so two identical lines on one side and
/// one on the other leave one line removed or added.
pub fn diff_composition(current: &[CompositionLine], next: &[CompositionLine]) -> CompositionDiff {
    let mut unmatched: Vec<Option<&CompositionLine>> = current.iter().map(Some).collect();
    let mut diff = CompositionDiff::default();

    for (next_idx, line) in next.iter().enumerate() {
        let found = unmatched
            .iter()
            .position(|candidate| candidate.map_or(false, |c| c == line));

        match found {
            Some(current_idx) => {
                unmatched[current_idx] = None;
                diff.kept.push((current_idx, next_idx));
            }
            None => diff.added.push(next_idx),
        }
    }

    diff.removed = unmatched
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| line.map(|_| idx))
        .collect();

    diff
}
