//! Per-visitor cart store.
//!
//! A [`CartStore`] owns one [`CartState`] inside a `tokio::sync::watch`
//! channel. Every transition goes through `send_modify`, so subscribers see
//! the optimistic view as soon as a mutation is queued and the reconciled
//! view as soon as the platform answers.

use limecart_core::{
    CartAction, CartId, CartMutation, CartState, MutationId, MutationOutcome, OptimisticViewModel,
};
use limecart_core::cart::CartStateError;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use super::api::CartApi;
use crate::shopify::ShopifyError;

/// Errors from applying a mutation to a cart store.
#[derive(Debug, Error)]
pub enum CartError {
    /// The platform rejected or never answered the mutation. The optimistic
    /// change has already been dropped from the view.
    #[error("{action} failed: {source}")]
    Submit {
        action: CartAction,
        #[source]
        source: ShopifyError,
    },

    /// Fetching the cart failed.
    #[error("cart fetch failed: {0}")]
    Fetch(#[source] ShopifyError),

    /// The mutation cannot be sent as requested.
    #[error("invalid cart mutation: {0}")]
    InvalidMutation(String),

    /// Reconciliation bookkeeping went wrong.
    #[error(transparent)]
    State(#[from] CartStateError),
}

/// Read side of a [`CartStore`].
#[derive(Debug, Clone)]
pub struct CartSubscription {
    receiver: watch::Receiver<CartState>,
}

impl CartSubscription {
    /// Current view.
    #[must_use]
    pub fn view(&self) -> OptimisticViewModel {
        self.receiver.borrow().view()
    }

    /// Wait for the next transition and return the view after it.
    ///
    /// Returns `None` once the store is dropped.
    pub async fn changed(&mut self) -> Option<OptimisticViewModel> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().view())
    }
}

/// Cart state for one visitor plus the driver that talks to the platform.
#[derive(Debug)]
pub struct CartStore {
    state: watch::Sender<CartState>,
    // Held while a cart is being created so concurrent adds do not create two.
    creating: Mutex<()>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CartStore {
    /// Start from a known snapshot, or none if the visitor has no cart yet.
    #[must_use]
    pub fn new(snapshot: Option<limecart_core::CartSnapshot>) -> Self {
        let (state, _) = watch::channel(CartState::new(snapshot));
        Self {
            state,
            creating: Mutex::new(()),
        }
    }

    /// Build a store from the platform's current copy of `cart_id`.
    ///
    /// A failed fetch is logged and the store starts empty; the visitor still
    /// gets a working cart.
    #[instrument(skip(api))]
    pub async fn load<A: CartApi>(api: &A, cart_id: Option<&CartId>) -> Self {
        let Some(cart_id) = cart_id else {
            return Self::new(None);
        };

        match api.fetch_cart(cart_id).await {
            Ok(Some(snapshot)) => Self::new(Some(snapshot)),
            Ok(None) => {
                info!("Cart no longer exists, starting empty");
                Self::new(None)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch cart, starting empty");
                Self::new(None)
            }
        }
    }

    /// Subscribe to view changes.
    #[must_use]
    pub fn subscribe(&self) -> CartSubscription {
        CartSubscription {
            receiver: self.state.subscribe(),
        }
    }

    /// Current view.
    #[must_use]
    pub fn view(&self) -> OptimisticViewModel {
        self.state.borrow().view()
    }

    /// Copy of the full reconciliation state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.state.borrow().clone()
    }

    /// Platform cart ID, once the cart exists.
    #[must_use]
    pub fn cart_id(&self) -> Option<CartId> {
        self.state.borrow().cart_id().cloned()
    }

    /// Apply one mutation.
    ///
    /// The optimistic view is published before the request leaves; the
    /// returned view is the one published after the platform answered.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidMutation`] without touching the state when
    /// the mutation is empty or targets a line that only exists locally, and
    /// [`CartError::Submit`] after reverting when the platform rejects it.
    #[instrument(skip(self, api, mutation), fields(action = %mutation.action()))]
    pub async fn apply<A: CartApi>(
        &self,
        api: &A,
        mutation: CartMutation,
    ) -> Result<OptimisticViewModel, CartError> {
        validate(&mutation)?;

        let action = mutation.action();
        let request = mutation.clone();
        let id = self.modify(MutationId::default(), |state| state.enqueue(mutation));
        let in_flight = InFlight { store: self, id };
        debug!(mutation = %id, "Queued cart mutation");

        let needs_cart = self.cart_id().is_none();
        let creating = if needs_cart {
            Some(self.creating.lock().await)
        } else {
            None
        };

        // Another request may have created the cart while we waited.
        let cart_id = self.cart_id();
        self.modify(Ok(()), |state| state.mark_submitted(id))?;

        let result = api.submit(cart_id.as_ref(), &request).await;
        in_flight.landed();

        let outcome = match result {
            Ok(snapshot) => self.modify(Err(CartStateError::Unknown(id)), |state| {
                state.settle(id, snapshot)
            }),
            Err(e) => {
                drop(creating);
                self.revert(id, action, &e);
                return Err(CartError::Submit { action, source: e });
            }
        };
        drop(creating);

        if let MutationOutcome::Settled {
            superseded,
            snapshot_applied,
            ..
        } = outcome?
        {
            if !snapshot_applied {
                debug!(mutation = %id, "Discarded response older than the current cart");
            }
            if !superseded.is_empty() {
                debug!(mutation = %id, superseded = superseded.len(), "Response covers earlier mutations");
            }
        }

        Ok(self.view())
    }

    /// Apply mutations one after the other, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`apply`](Self::apply). Mutations before it
    /// stay applied.
    pub async fn apply_all<A: CartApi>(
        &self,
        api: &A,
        mutations: Vec<CartMutation>,
    ) -> Result<OptimisticViewModel, CartError> {
        let mut view = self.view();
        for mutation in mutations {
            view = self.apply(api, mutation).await?;
        }
        Ok(view)
    }

    /// Replace the snapshot with the platform's current copy.
    ///
    /// Pending mutations keep overlaying the fresh snapshot. A copy older than
    /// the snapshot already held is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Fetch`] if the cart cannot be fetched; the state is
    /// left untouched.
    #[instrument(skip(self, api))]
    pub async fn refresh<A: CartApi>(&self, api: &A) -> Result<OptimisticViewModel, CartError> {
        let Some(cart_id) = self.cart_id() else {
            return Ok(self.view());
        };

        let snapshot = api.fetch_cart(&cart_id).await.map_err(|e| {
            warn!(cart_id = %cart_id, error = %e, "Failed to refresh cart");
            CartError::Fetch(e)
        })?;

        if !self.modify(true, |state| state.refresh(snapshot)) {
            debug!(cart_id = %cart_id, "Fetched cart is older than the current one");
        }
        Ok(self.view())
    }

    fn revert(&self, id: MutationId, action: CartAction, error: &ShopifyError) {
        match self.modify(Err(CartStateError::Unknown(id)), |state| state.fail(id)) {
            Ok(_) => {
                warn!(mutation = %id, action = %action, error = %error, "Cart mutation failed, reverting");
            }
            Err(CartStateError::NotPending(_)) => {
                // A newer response already replaced the snapshot.
                warn!(mutation = %id, action = %action, error = %error, "Superseded cart mutation failed");
            }
            Err(e) => {
                warn!(mutation = %id, error = %e, "Could not revert cart mutation");
            }
        }
    }

    fn modify<T>(&self, initial: T, f: impl FnOnce(&mut CartState) -> T) -> T {
        let mut out = initial;
        self.state.send_modify(|state| out = f(state));
        out
    }
}

/// Fails a queued mutation whose `apply` was dropped before the platform
/// answered, so it cannot linger in the pending set.
struct InFlight<'a> {
    store: &'a CartStore,
    id: MutationId,
}

impl InFlight<'_> {
    /// The platform answered; settling or failing is up to the caller.
    fn landed(self) {
        std::mem::forget(self);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let id = self.id;
        match self
            .store
            .modify(Err(CartStateError::Unknown(id)), |state| state.fail(id))
        {
            Ok(_) => warn!(mutation = %id, "Cart mutation abandoned before the platform answered, reverting"),
            Err(CartStateError::NotPending(_)) => {}
            Err(e) => warn!(mutation = %id, error = %e, "Could not revert abandoned cart mutation"),
        }
    }
}

fn validate(mutation: &CartMutation) -> Result<(), CartError> {
    if mutation.is_empty() {
        return Err(CartError::InvalidMutation(format!(
            "{} without lines",
            mutation.action()
        )));
    }

    let optimistic = match mutation {
        CartMutation::Add(_) => None,
        CartMutation::Update(lines) => lines.iter().map(|l| &l.id).find(|id| id.is_optimistic()),
        CartMutation::Remove(ids) => ids.iter().find(|id| id.is_optimistic()),
    };

    if let Some(id) = optimistic {
        return Err(CartError::InvalidMutation(format!(
            "line {id} is not confirmed yet"
        )));
    }

    Ok(())
}
