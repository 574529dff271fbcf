//! Session middleware configuration.
//!
//! Sets up in-memory sessions using tower-sessions backed by moka. The session
//! only holds the visitor key and the platform cart ID; the cart itself lives
//! on the platform. Expired sessions are evicted and the store is bounded, so
//! crawlers cannot grow it without limit.

use limecart_core::CartId;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_moka_store::MokaStore;
use uuid::Uuid;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "limecart_session";

/// Session expiry time in seconds (14 days, the platform's cart lifetime).
const SESSION_EXPIRY_SECONDS: i64 = 14 * 24 * 60 * 60;

/// Session keys.
pub mod session_keys {
    pub const VISITOR: &str = "visitor";
    pub const CART_ID: &str = "cart_id";
}

/// Create the session store, holding at most one session per live cart store.
#[must_use]
pub fn create_session_store(config: &StorefrontConfig) -> MokaStore {
    MokaStore::new(Some(config.carts.capacity))
}

/// Create the session layer.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MokaStore> {
    SessionManagerLayer::new(create_session_store(config))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Get the visitor key, minting one on first visit.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn visitor_key(session: &Session) -> Result<Uuid, tower_sessions::session::Error> {
    if let Some(key) = session.get::<Uuid>(session_keys::VISITOR).await? {
        return Ok(key);
    }

    let key = Uuid::new_v4();
    session.insert(session_keys::VISITOR, key).await?;
    Ok(key)
}

/// Get the cart ID remembered for this session.
pub async fn get_cart_id(session: &Session) -> Option<CartId> {
    session
        .get::<CartId>(session_keys::CART_ID)
        .await
        .ok()
        .flatten()
}

/// Remember the cart ID for this session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn set_cart_id(
    session: &Session,
    cart_id: &CartId,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART_ID, cart_id).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration as StdDuration;

    use secrecy::SecretString;
    use tower_sessions::SessionStore;
    use tower_sessions::cookie::time::{Duration, OffsetDateTime};
    use tower_sessions::session::{Id, Record};

    use super::*;
    use crate::config::{CartStoreConfig, ShopifyStorefrontConfig};

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            shopify: ShopifyStorefrontConfig {
                store: "test.myshopify.com".to_string(),
                api_version: "2026-01".to_string(),
                storefront_private_token: SecretString::from("3f9a1c7be04d52e8a6b1f0c9d7e2a4b8"),
                country: None,
                language: None,
            },
            carts: CartStoreConfig {
                capacity: 10,
                idle_timeout: StdDuration::from_secs(60),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    fn record(expires_in: Duration) -> Record {
        Record {
            id: Id::default(),
            data: Default::default(),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_live_session_is_kept() {
        let store = create_session_store(&config());
        let mut live = record(Duration::minutes(5));

        store.create(&mut live).await.unwrap();
        assert!(store.load(&live.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_session_is_evicted() {
        let store = create_session_store(&config());
        let mut expired = record(Duration::seconds(-1));

        store.create(&mut expired).await.unwrap();
        assert!(store.load(&expired.id).await.unwrap().is_none());
    }
}
