//! Domain model and its wire conversions.

pub mod conversion;
pub mod types;

pub use types::*;
