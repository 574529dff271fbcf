//! Catalog types returned by the Storefront API.
//!
//! Cart types live in `limecart-core`; these cover the product listing only.

use limecart_core::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// Product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image URL.
    pub url: String,
    /// Alt text for accessibility.
    pub alt_text: Option<String>,
    /// Image width in pixels.
    pub width: Option<i64>,
    /// Image height in pixels.
    pub height: Option<i64>,
}

/// A product card on the home page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedProduct {
    /// Product ID.
    pub id: ProductId,
    /// Product title.
    pub title: String,
    /// Product handle (URL slug).
    pub handle: String,
    /// Lowest variant price.
    pub min_price: Money,
    /// Featured image.
    pub featured_image: Option<Image>,
    /// Whether the product is a gift card (`custom.giftcard` metafield).
    pub is_gift: bool,
}

impl RecommendedProduct {
    /// Storefront URL of the product.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/products/{}", self.handle)
    }
}
