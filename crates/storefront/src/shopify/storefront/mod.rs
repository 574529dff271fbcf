//! Shopify Storefront API client implementation.
//!
//! Uses `graphql_client` envelopes with `reqwest` 0.13 for HTTP.
//! Caches the home page catalog using `moka` (5-minute TTL). Carts are never
//! cached here; the per-visitor [`crate::cart::CartStore`] owns cart state.

mod cache;
mod conversions;

pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use graphql_client::{GraphQLQuery, Response};
use limecart_core::cart::{LineInput, LineUpdate};
use limecart_core::{CartId, CartLineId, CartSnapshot};
use moka::future::Cache;
use secrecy::ExposeSecret;
use tracing::{debug, instrument};

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::types::RecommendedProduct;
use crate::shopify::{GraphQLError, GraphQLErrorLocation, ShopifyError};

use cache::{CacheKey, CacheValue};
use conversions::{convert_cart, convert_recommended_product, join_user_errors};
use queries::fragments::{CartLineInput, CartLineUpdateInput, CartPayload};
use queries::{
    AddCartLines, CreateCart, GetCart, RecommendedProducts, RemoveCartLines, UpdateCartLines,
    add_cart_lines, create_cart, get_cart, recommended_products, remove_cart_lines,
    update_cart_lines,
};

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Provides typed access to cart operations and the home page catalog.
/// Catalog responses are cached for 5 minutes.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    country: Option<String>,
    language: Option<String>,
    cache: Cache<CacheKey, CacheValue>,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        Self::with_endpoint(config, config.endpoint())
    }

    /// Create a client that talks to `endpoint` instead of the store's own
    /// GraphQL URL.
    #[must_use]
    pub fn with_endpoint(config: &ShopifyStorefrontConfig, endpoint: String) -> Self {
        let cache = Cache::builder()
            .max_capacity(100)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::new(),
                endpoint,
                access_token: config.storefront_private_token.expose_secret().to_string(),
                country: config.country.clone(),
                language: config.language.clone(),
                cache,
            }),
        }
    }

    /// Execute a GraphQL query.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ShopifyError> {
        let request_body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            // Private access tokens use a different header than public tokens
            .header(
                "Shopify-Storefront-Private-Token",
                &self.inner.access_token,
            )
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                operation = request_body.operation_name,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            ))]));
        }

        let response: Response<Q::ResponseData> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    operation = request_body.operation_name,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse Shopify GraphQL response"
                );
                return Err(ShopifyError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");

            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(convert_graphql_error).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                operation = request_body.operation_name,
                "Shopify GraphQL response has no data and no errors"
            );
            ShopifyError::GraphQL(vec![GraphQLError::message("No data in response")])
        })
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Get an existing cart.
    ///
    /// Returns `Ok(None)` when the platform no longer knows the cart (expired
    /// or already checked out).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the cart is malformed.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &CartId) -> Result<Option<CartSnapshot>, ShopifyError> {
        let variables = get_cart::Variables {
            cart_id: cart_id.to_string(),
        };

        let data = self.execute::<GetCart>(variables).await?;

        data.cart.map(convert_cart).transpose()
    }

    /// Create a new cart holding `lines`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart creation fails or user errors are returned.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn create_cart(&self, lines: &[LineInput]) -> Result<CartSnapshot, ShopifyError> {
        let variables = create_cart::Variables {
            input: create_cart::CartInput {
                lines: lines.iter().map(line_input).collect(),
            },
        };

        let data = self.execute::<CreateCart>(variables).await?;

        cart_from_payload(data.cart_create, "create cart")
    }

    /// Add lines to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id, lines = lines.len()))]
    pub async fn add_cart_lines(
        &self,
        cart_id: &CartId,
        lines: &[LineInput],
    ) -> Result<CartSnapshot, ShopifyError> {
        let variables = add_cart_lines::Variables {
            cart_id: cart_id.to_string(),
            lines: lines.iter().map(line_input).collect(),
        };

        let data = self.execute::<AddCartLines>(variables).await?;

        cart_from_payload(data.cart_lines_add, "add cart lines")
    }

    /// Set the quantity of existing lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id, lines = lines.len()))]
    pub async fn update_cart_lines(
        &self,
        cart_id: &CartId,
        lines: &[LineUpdate],
    ) -> Result<CartSnapshot, ShopifyError> {
        let variables = update_cart_lines::Variables {
            cart_id: cart_id.to_string(),
            lines: lines
                .iter()
                .map(|line| CartLineUpdateInput {
                    id: line.id.to_string(),
                    quantity: i64::from(line.quantity),
                })
                .collect(),
        };

        let data = self.execute::<UpdateCartLines>(variables).await?;

        cart_from_payload(data.cart_lines_update, "update cart lines")
    }

    /// Remove lines from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, line_ids), fields(cart_id = %cart_id, lines = line_ids.len()))]
    pub async fn remove_cart_lines(
        &self,
        cart_id: &CartId,
        line_ids: &[CartLineId],
    ) -> Result<CartSnapshot, ShopifyError> {
        let variables = remove_cart_lines::Variables {
            cart_id: cart_id.to_string(),
            line_ids: line_ids.iter().map(ToString::to_string).collect(),
        };

        let data = self.execute::<RemoveCartLines>(variables).await?;

        cart_from_payload(data.cart_lines_remove, "remove cart lines")
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Get the four most recently updated products for the home page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_recommended_products(&self) -> Result<Vec<RecommendedProduct>, ShopifyError> {
        let cache_key = CacheKey::RecommendedProducts {
            country: self.inner.country.clone(),
            language: self.inner.language.clone(),
        };

        if let Some(CacheValue::RecommendedProducts(products)) =
            self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for recommended products");
            return Ok(products);
        }

        let variables = recommended_products::Variables {
            country: self.inner.country.clone(),
            language: self.inner.language.clone(),
        };

        let data = self.execute::<RecommendedProducts>(variables).await?;

        let products: Vec<RecommendedProduct> = data
            .products
            .nodes
            .into_iter()
            .filter_map(convert_recommended_product)
            .collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::RecommendedProducts(products.clone()))
            .await;

        Ok(products)
    }
}

fn line_input(line: &LineInput) -> CartLineInput {
    CartLineInput {
        merchandise_id: line.merchandise_id.to_string(),
        quantity: i64::from(line.quantity),
    }
}

/// Unwrap a cart mutation payload, surfacing user errors first.
fn cart_from_payload(
    payload: Option<CartPayload>,
    operation: &str,
) -> Result<CartSnapshot, ShopifyError> {
    let Some(payload) = payload else {
        return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
            "Failed to {operation}"
        ))]));
    };

    if !payload.user_errors.is_empty() {
        return Err(ShopifyError::UserError(join_user_errors(
            &payload.user_errors,
        )));
    }

    payload.cart.map_or_else(
        || {
            Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
                "Failed to {operation}: no cart returned"
            ))]))
        },
        convert_cart,
    )
}

fn convert_graphql_error(e: graphql_client::Error) -> GraphQLError {
    GraphQLError {
        message: e.message,
        locations: e.locations.map_or_else(Vec::new, |locs| {
            locs.into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect()
        }),
        path: e.path.map_or_else(Vec::new, |p| {
            p.into_iter()
                .map(|fragment| match fragment {
                    graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                    graphql_client::PathFragment::Index(i) => serde_json::Value::Number(i.into()),
                })
                .collect()
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> CartPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_user_errors_take_precedence() {
        let result = cart_from_payload(
            Some(payload(json!({
                "cart": null,
                "userErrors": [{ "code": "INVALID", "field": null, "message": "Sold out" }],
            }))),
            "add cart lines",
        );
        assert!(matches!(result, Err(ShopifyError::UserError(m)) if m == "Sold out"));
    }

    #[test]
    fn test_missing_payload() {
        let result = cart_from_payload(None, "create cart");
        assert_eq!(
            result.unwrap_err().to_string(),
            "GraphQL errors: Failed to create cart"
        );
    }

    #[test]
    fn test_missing_cart_without_user_errors() {
        let result = cart_from_payload(
            Some(payload(json!({ "cart": null, "userErrors": [] }))),
            "remove cart lines",
        );
        assert!(matches!(result, Err(ShopifyError::GraphQL(_))));
    }

    #[test]
    fn test_convert_graphql_error_path() {
        let error: graphql_client::Error = serde_json::from_value(json!({
            "message": "Throttled",
            "locations": [{ "line": 2, "column": 3 }],
            "path": ["cartLinesAdd", 0],
        }))
        .unwrap();
        let converted = convert_graphql_error(error);
        assert_eq!(converted.locations.len(), 1);
        assert_eq!(converted.path, vec![json!("cartLinesAdd"), json!(0)]);
    }
}
