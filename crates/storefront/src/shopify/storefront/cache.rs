//! Cache types for Storefront API responses.

use crate::shopify::types::RecommendedProduct;

/// Cache key for catalog responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// Home page product cards for a buyer context.
    RecommendedProducts {
        country: Option<String>,
        language: Option<String>,
    },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    RecommendedProducts(Vec<RecommendedProduct>),
}
