//! Domain models for the Livflow back-office

mod ingredient;
mod inventory;
mod recipe;

pub use ingredient::*;
pub use inventory::*;
pub use recipe::*;
