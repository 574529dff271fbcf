//! Cart stores keyed by visitor.

use std::sync::Arc;

use limecart_core::CartId;
use moka::future::Cache;
use tracing::debug;
use uuid::Uuid;

use super::api::CartApi;
use super::store::CartStore;
use crate::config::CartStoreConfig;

/// Live cart stores, one per visitor.
///
/// Stores idle longer than the configured timeout are evicted; the next
/// request rebuilds them from the cart ID kept in the visitor's session.
#[derive(Clone)]
pub struct CartRegistry {
    stores: Cache<Uuid, Arc<CartStore>>,
}

impl CartRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: &CartStoreConfig) -> Self {
        let stores = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_idle(config.idle_timeout)
            .build();

        Self { stores }
    }

    /// Get the visitor's store, loading it from the platform if needed.
    ///
    /// Concurrent calls for the same visitor share one load.
    pub async fn get_or_load<A: CartApi>(
        &self,
        api: &A,
        visitor: Uuid,
        cart_id: Option<&CartId>,
    ) -> Arc<CartStore> {
        self.stores
            .get_with(visitor, async {
                debug!(visitor = %visitor, "Loading cart store");
                Arc::new(CartStore::load(api, cart_id).await)
            })
            .await
    }
}
