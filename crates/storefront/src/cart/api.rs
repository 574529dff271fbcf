//! The two platform capabilities a cart store needs.

use std::future::Future;

use limecart_core::{CartId, CartMutation, CartSnapshot};

use crate::shopify::{ShopifyError, StorefrontClient};

/// Cart fetch and mutation submission.
///
/// Implemented by [`StorefrontClient`] for production and by in-process fakes
/// in tests. Every successful call returns the complete cart as the platform
/// now sees it.
pub trait CartApi: Send + Sync {
    /// Fetch a cart. A cart the platform no longer knows is `Ok(None)`.
    fn fetch_cart(
        &self,
        cart_id: &CartId,
    ) -> impl Future<Output = Result<Option<CartSnapshot>, ShopifyError>> + Send;

    /// Submit one mutation.
    ///
    /// `LinesAdd` without a cart creates one holding those lines; the other
    /// actions need an existing cart and fail with [`ShopifyError::NotFound`].
    fn submit(
        &self,
        cart_id: Option<&CartId>,
        mutation: &CartMutation,
    ) -> impl Future<Output = Result<CartSnapshot, ShopifyError>> + Send;
}

impl CartApi for StorefrontClient {
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Option<CartSnapshot>, ShopifyError> {
        self.get_cart(cart_id).await
    }

    async fn submit(
        &self,
        cart_id: Option<&CartId>,
        mutation: &CartMutation,
    ) -> Result<CartSnapshot, ShopifyError> {
        match (cart_id, mutation) {
            (None, CartMutation::Add(lines)) => self.create_cart(lines).await,
            (Some(id), CartMutation::Add(lines)) => self.add_cart_lines(id, lines).await,
            (Some(id), CartMutation::Update(lines)) => self.update_cart_lines(id, lines).await,
            (Some(id), CartMutation::Remove(line_ids)) => {
                self.remove_cart_lines(id, line_ids).await
            }
            (None, other) => Err(ShopifyError::NotFound(format!(
                "no cart to apply {} to",
                other.action()
            ))),
        }
    }
}
