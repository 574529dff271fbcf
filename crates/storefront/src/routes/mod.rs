//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Recommended products (JSON)
//! GET  /health                 - Health check
//!
//! # Cart
//! GET  /cart                   - Current optimistic cart view
//! POST /cart                   - Apply LinesAdd / LinesUpdate / LinesRemove
//! GET  /cart/count             - Total quantity
//! GET  /cart/checkout          - Redirect to the platform checkout
//! ```

pub mod cart;
pub mod home;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::apply))
        .route("/count", get(cart::count))
        .route("/checkout", get(cart::checkout))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .nest("/cart", cart_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the platform.
async fn health() -> &'static str {
    "ok"
}
