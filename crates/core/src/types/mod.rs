//! Core types for Limecart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod quantity;

pub use id::*;
pub use money::{CurrencyCode, Money, MoneyError};
pub use quantity::Quantity;
