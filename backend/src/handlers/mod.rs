//! HTTP request handlers

mod health;
mod ingredient;
mod inventory;
mod recipe;

pub use health::*;
pub use ingredient::*;
pub use inventory::*;
pub use recipe::*;
