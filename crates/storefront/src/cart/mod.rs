//! Optimistic cart stores.
//!
//! - [`api`] - the fetch/submit capabilities a store drives
//! - [`store`] - one visitor's reconciliation state and its driver
//! - [`registry`] - live stores keyed by visitor

pub mod api;
pub mod registry;
pub mod store;

pub use api::CartApi;
pub use registry::CartRegistry;
pub use store::{CartError, CartStore, CartSubscription};
