//! Type conversion functions for Shopify Storefront API responses.

pub mod cart;
pub mod products;

pub use cart::{convert_cart, join_user_errors};
pub use products::convert_recommended_product;
