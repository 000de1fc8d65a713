//! Reckon Types
//!
//! This crate defines the value type shared across the Reckon workspace
//! (`reckon-calculator` and `reckon-core`). Keeping it separate lets both
//! crates exchange inputs and results without a dependency cycle.

mod types;
pub use types::Value;
