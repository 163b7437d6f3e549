//! Models for the Livflow back-office
//!
//! Re-exports the domain models from the shared crate

pub use shared::models::*;
