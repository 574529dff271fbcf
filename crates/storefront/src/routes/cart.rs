//! Cart route handlers.
//!
//! Every handler works on the visitor's [`CartStore`], so a response always
//! reflects the optimistic overlay of mutations still in flight from other
//! requests. The platform cart ID is remembered in the session.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Redirect, Response},
};
use limecart_core::cart::{LineInput, Merchandise};
use limecart_core::{CartLineId, CartMutation, MerchandiseId, OptimisticViewModel, Quantity};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::cart::CartStore;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{get_cart_id, set_cart_id, visitor_key};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// A line to add.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLine {
    pub merchandise_id: MerchandiseId,
    #[serde(default = "one")]
    pub quantity: u32,
    /// Display data shown until the platform confirms the line.
    #[serde(default)]
    pub preview: Option<Merchandise>,
}

const fn one() -> u32 {
    1
}

/// A requested quantity change. Zero removes the line.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLine {
    pub id: CartLineId,
    pub quantity: u32,
}

/// Body of `POST /cart`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", content = "inputs")]
pub enum CartRequest {
    LinesAdd(Vec<AddLine>),
    LinesUpdate(Vec<UpdateLine>),
    LinesRemove(Vec<CartLineId>),
}

impl CartRequest {
    /// Wire name of the action.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::LinesAdd(_) => "LinesAdd",
            Self::LinesUpdate(_) => "LinesUpdate",
            Self::LinesRemove(_) => "LinesRemove",
        }
    }

    /// Number of lines in the request.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::LinesAdd(lines) => lines.len(),
            Self::LinesUpdate(lines) => lines.len(),
            Self::LinesRemove(ids) => ids.len(),
        }
    }

    /// Whether the request carries no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Turn the request into the mutations to apply, in order.
    ///
    /// A quantity update to zero becomes a remove, so one update request may
    /// produce two mutations.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] for an empty request or an add with a
    /// quantity of zero.
    pub fn into_mutations(self) -> Result<Vec<CartMutation>> {
        if self.is_empty() {
            return Err(AppError::BadRequest(format!(
                "{} needs at least one line",
                self.action()
            )));
        }

        match self {
            Self::LinesAdd(lines) => {
                let inputs = lines
                    .into_iter()
                    .map(|line| -> Result<LineInput> {
                        let quantity = Quantity::new(line.quantity).ok_or_else(|| {
                            AppError::BadRequest(format!(
                                "quantity for {} must be at least 1",
                                line.merchandise_id
                            ))
                        })?;
                        let input = LineInput::new(line.merchandise_id, quantity);
                        Ok(match line.preview {
                            Some(preview) => input.with_preview(preview),
                            None => input,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(vec![CartMutation::Add(inputs)])
            }
            Self::LinesUpdate(lines) => Ok(CartMutation::update_lines(
                lines.into_iter().map(|l| (l.id, l.quantity)).collect(),
            )),
            Self::LinesRemove(ids) => Ok(vec![CartMutation::Remove(ids)]),
        }
    }
}

/// Body of `GET /cart/count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartCount {
    pub total_quantity: u64,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the visitor's cart store, loading it on first use.
async fn visitor_store(state: &AppState, session: &Session) -> Result<Arc<CartStore>> {
    let visitor = visitor_key(session).await?;
    let cart_id = get_cart_id(session).await;

    Ok(state
        .carts()
        .get_or_load(state.storefront(), visitor, cart_id.as_ref())
        .await)
}

/// Remember a newly created cart in the session.
async fn remember_cart(session: &Session, store: &CartStore) {
    let Some(cart_id) = store.cart_id() else {
        return;
    };

    if get_cart_id(session).await.as_ref() == Some(&cart_id) {
        return;
    }

    if let Err(e) = set_cart_id(session, &cart_id).await {
        tracing::error!("Failed to save cart ID to session: {e}");
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Current cart view.
///
/// The snapshot is refreshed from the platform first; if that fails the last
/// known view is served.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<OptimisticViewModel>> {
    let store = visitor_store(&state, &session).await?;

    let view = match store.refresh(state.storefront()).await {
        Ok(view) => view,
        Err(_) => store.view(),
    };

    Ok(Json(view))
}

/// Apply a cart mutation and return the reconciled view.
#[instrument(skip(state, session, body))]
pub async fn apply(
    State(state): State<AppState>,
    session: Session,
    body: std::result::Result<Json<CartRequest>, JsonRejection>,
) -> Result<Json<OptimisticViewModel>> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let action = request.action();
    let lines = request.len().to_string();
    let mutations = request.into_mutations()?;

    add_breadcrumb("cart", action, Some(&[("lines", lines.as_str())]));

    let store = visitor_store(&state, &session).await?;
    let result = store.apply_all(state.storefront(), mutations).await;

    // The cart may have been created even if a later mutation failed.
    remember_cart(&session, &store).await;

    Ok(Json(result?))
}

/// Cart count badge.
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> Result<Json<CartCount>> {
    let store = visitor_store(&state, &session).await?;

    Ok(Json(CartCount {
        total_quantity: store.view().total_quantity,
    }))
}

/// Redirect to the platform checkout, or back to the cart when there is none.
#[instrument(skip(state, session))]
pub async fn checkout(State(state): State<AppState>, session: Session) -> Result<Response> {
    let store = visitor_store(&state, &session).await?;
    let view = store.view();

    Ok(view.checkout.url().map_or_else(
        || Redirect::to("/cart").into_response(),
        |url| Redirect::to(url.as_str()).into_response(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(value: serde_json::Value) -> CartRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_add_defaults_to_one() {
        let mutations = request(json!({
            "action": "LinesAdd",
            "inputs": [{ "merchandiseId": "gid://shopify/ProductVariant/1" }],
        }))
        .into_mutations()
        .unwrap();

        let CartMutation::Add(inputs) = &mutations[0] else {
            panic!("expected an add");
        };
        assert_eq!(inputs[0].quantity, Quantity::ONE);
    }

    #[test]
    fn test_add_with_zero_quantity_is_rejected() {
        let result = request(json!({
            "action": "LinesAdd",
            "inputs": [{ "merchandiseId": "gid://shopify/ProductVariant/1", "quantity": 0 }],
        }))
        .into_mutations();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_update_to_zero_splits_into_remove() {
        let mutations = request(json!({
            "action": "LinesUpdate",
            "inputs": [
                { "id": "gid://shopify/CartLine/1", "quantity": 4 },
                { "id": "gid://shopify/CartLine/2", "quantity": 0 },
            ],
        }))
        .into_mutations()
        .unwrap();

        assert_eq!(mutations.len(), 2);
        assert!(matches!(&mutations[0], CartMutation::Update(lines) if lines.len() == 1));
        assert!(matches!(&mutations[1], CartMutation::Remove(ids) if ids.len() == 1));
    }

    #[test]
    fn test_empty_request_is_rejected() {
        let result = request(json!({ "action": "LinesRemove", "inputs": [] })).into_mutations();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_unknown_action_does_not_parse() {
        let result = serde_json::from_value::<CartRequest>(json!({
            "action": "NoteUpdate",
            "inputs": "hello",
        }));
        assert!(result.is_err());
    }
}
