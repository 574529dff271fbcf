//! Product type conversion functions.

use limecart_core::ProductId;
use tracing::warn;

use crate::shopify::types::{Image, RecommendedProduct};

use super::super::queries::fragments::ImageFields;
use super::super::queries::recommended_products::RecommendedProductFields;
use super::cart::convert_money;

fn convert_image(image: ImageFields) -> Image {
    Image {
        url: image.url,
        alt_text: image.alt_text,
        width: image.width,
        height: image.height,
    }
}

/// Convert a product card, skipping products with an unusable price.
pub fn convert_recommended_product(product: RecommendedProductFields) -> Option<RecommendedProduct> {
    let min_price = match convert_money(&product.price_range.min_variant_price) {
        Ok(price) => price,
        Err(e) => {
            warn!(product_id = %product.id, error = %e, "Skipping product with invalid price");
            return None;
        }
    };

    Some(RecommendedProduct {
        id: ProductId::from(product.id),
        title: product.title,
        handle: product.handle,
        min_price,
        featured_image: product.featured_image.map(convert_image),
        is_gift: product.gift_product.is_some_and(|m| m.value == "true"),
    })
}
