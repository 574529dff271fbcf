//! Home page route handler.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::shopify::RecommendedProduct;
use crate::state::AppState;

/// Shown instead of the product grid when there is nothing to list.
pub const NO_PRODUCTS_MESSAGE: &str = "no products found";

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct HomeResponse {
    pub products: Vec<RecommendedProduct>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl HomeResponse {
    fn new(products: Vec<RecommendedProduct>) -> Self {
        let message = products.is_empty().then_some(NO_PRODUCTS_MESSAGE);
        Self { products, message }
    }
}

/// Recommended products for the home page.
///
/// A failed catalog fetch is logged and served as an empty list.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Json<HomeResponse> {
    let products = state
        .storefront()
        .get_recommended_products()
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch recommended products: {e}");
            Vec::new()
        });

    Json(HomeResponse::new(products))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_catalog_carries_message() {
        let json = serde_json::to_value(HomeResponse::new(vec![])).unwrap();
        assert_eq!(json["message"], NO_PRODUCTS_MESSAGE);
        assert_eq!(json["products"], serde_json::json!([]));
    }
}
