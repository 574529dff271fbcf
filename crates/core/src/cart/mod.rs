//! Shopping cart model and optimistic reconciliation.
//!
//! # Overview
//!
//! The cart is owned by the commerce platform. Locally we only ever hold:
//!
//! - the last authoritative [`CartSnapshot`] (replaced wholesale on every
//!   successful response), and
//! - the ordered list of [`PendingMutation`]s that have not been answered yet.
//!
//! [`compute_view`] folds the pending mutations over the snapshot to produce
//! the [`OptimisticViewModel`] the rendering layer shows. Quantities are
//! predicted; money is never predicted and always comes from the snapshot.
//!
//! [`CartState`] is the reconciliation state machine that moves mutations
//! through `Queued -> Submitted -> Settled | Failed`.

pub mod mutation;
pub mod snapshot;
pub mod state;
pub mod view;

pub use mutation::{
    CartAction, CartMutation, LineInput, LineUpdate, MutationId, MutationState, PendingMutation,
};
pub use snapshot::{
    CartCost, CartSnapshot, DiscountCode, LineCost, LineItem, Merchandise, ProductRef,
    SelectedOption, SnapshotError,
};
pub use state::{CartState, CartStateError, MutationOutcome};
pub use view::{CheckoutHandoff, OptimisticLine, OptimisticViewModel, compute_view};
