//! Business logic services for the Livflow back-office

pub mod ingredient;
pub mod inventory;
pub mod recipe;

pub use ingredient::{IngredientService, IngredientUpdate};
pub use inventory::InventoryService;
pub use recipe::RecipeService;
