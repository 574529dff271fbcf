//! Limecart Core - Cart model and optimistic reconciliation.
//!
//! This crate provides the types shared by every Limecart component:
//! - `storefront` - Storefront API client, cart stores and HTTP surface
//! - `integration-tests` - End-to-end cart scenarios
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async runtime. The cart view shown to a visitor is always
//! derived from two inputs: the last authoritative [`cart::CartSnapshot`]
//! and the ordered list of in-flight [`cart::PendingMutation`]s.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for platform IDs, money and quantities
//! - [`cart`] - Snapshots, mutations, view derivation and the reconciliation state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{
    CartAction, CartMutation, CartSnapshot, CartState, CheckoutHandoff, MutationId,
    MutationOutcome, MutationState, OptimisticLine, OptimisticViewModel, PendingMutation,
    compute_view,
};
pub use types::*;
