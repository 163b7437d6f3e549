//! Shared types and models for the Livflow back-office
//!
//! This crate contains the recipe costing and stock ledger domain shared
//! between the backend and the browser (via WASM). Nothing in here performs
//! I/O.

pub mod composition;
pub mod costing;
pub mod error;
pub mod models;
pub mod reconciliation;
pub mod types;
pub mod validation;

pub use composition::*;
pub use costing::*;
pub use error::*;
pub use models::*;
pub use reconciliation::*;
pub use types::*;
pub use validation::*;
