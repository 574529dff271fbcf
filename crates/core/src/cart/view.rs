//! Optimistic cart view derivation.
//!
//! [`compute_view`] is a pure function of the last snapshot and the pending
//! mutations. It is re-run whenever either input changes and never keeps
//! state of its own.

use serde::{Deserialize, Serialize};
use url::Url;

use super::mutation::{CartMutation, PendingMutation};
use super::snapshot::{CartCost, CartSnapshot, DiscountCode, LineCost, Merchandise};
use crate::types::{CartId, CartLineId, MerchandiseId, Quantity};

/// Where the checkout button leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CheckoutHandoff {
    /// External link to the platform's checkout.
    Link {
        /// Checkout URL from the last snapshot.
        url: Url,
    },
    /// No checkout URL known; the checkout control is disabled.
    Disabled,
}

impl CheckoutHandoff {
    /// The checkout URL, if checkout is enabled.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        match self {
            Self::Link { url } => Some(url),
            Self::Disabled => None,
        }
    }
}

/// A line as the rendering layer should show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimisticLine {
    /// Line ID; locally minted for lines that only exist optimistically.
    pub id: CartLineId,
    /// Variant ID.
    pub merchandise_id: MerchandiseId,
    /// Variant details, absent for an optimistic add without preview data.
    pub merchandise: Option<Merchandise>,
    /// Predicted quantity.
    pub quantity: Quantity,
    /// Last authoritative line cost, absent for lines the platform has not priced yet.
    pub cost: Option<LineCost>,
    /// Whether a pending mutation touches this line.
    pub is_optimistic: bool,
}

impl OptimisticLine {
    /// Quantity controls are disabled while the line is in flight.
    #[must_use]
    pub const fn controls_enabled(&self) -> bool {
        !self.is_optimistic
    }

    /// Whether the decrement button is enabled. At a quantity of one it stays
    /// enabled and removes the line, see [`decrement_removes`](Self::decrement_removes).
    #[must_use]
    pub const fn can_decrement(&self) -> bool {
        self.controls_enabled()
    }

    /// Whether the next decrement takes the line out of the cart.
    #[must_use]
    pub const fn decrement_removes(&self) -> bool {
        self.quantity.get() == 1
    }

    /// Mutation for the "+" control.
    #[must_use]
    pub fn increment(&self) -> Option<CartMutation> {
        self.controls_enabled().then(|| {
            CartMutation::set_quantity(self.id.clone(), self.quantity.incremented().get())
        })
    }

    /// Mutation for the "-" control; the last unit becomes a remove.
    #[must_use]
    pub fn decrement(&self) -> Option<CartMutation> {
        self.can_decrement().then(|| {
            CartMutation::set_quantity(
                self.id.clone(),
                self.quantity.decremented().map_or(0, Quantity::get),
            )
        })
    }

    /// Mutation for the remove control.
    #[must_use]
    pub fn remove(&self) -> Option<CartMutation> {
        self.controls_enabled()
            .then(|| CartMutation::Remove(vec![self.id.clone()]))
    }
}

/// Render-ready cart: predicted lines, authoritative money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimisticViewModel {
    /// Cart ID, absent until the platform has created the cart.
    pub cart_id: Option<CartId>,
    /// Lines in display order.
    pub lines: Vec<OptimisticLine>,
    /// Sum of the predicted line quantities.
    pub total_quantity: u64,
    /// Cost summary from the last snapshot, never recomputed locally.
    pub cost: Option<CartCost>,
    /// Discount codes from the last snapshot.
    pub discount_codes: Vec<DiscountCode>,
    /// Checkout handoff.
    pub checkout: CheckoutHandoff,
    /// Number of mutations still awaiting a response.
    pub pending: usize,
    /// Number of lines.
    pub line_count: usize,
    /// Whether the empty-cart state should be shown.
    pub is_empty: bool,
    /// Whether an applicable discount code is present.
    pub has_applicable_discount: bool,
}

impl OptimisticViewModel {
    /// Find a line by ID.
    #[must_use]
    pub fn line(&self, id: &CartLineId) -> Option<&OptimisticLine> {
        self.lines.iter().find(|l| &l.id == id)
    }
}

/// Derive the view from the last snapshot and the pending mutations.
///
/// Mutations are applied in submission order to a copy of the snapshot's
/// lines:
///
/// - an add merges into the line with the same merchandise, or appends a new
///   line with a locally minted ID,
/// - an update sets the quantity of the matching line,
/// - a remove deletes the matching lines.
///
/// IDs that match no line are ignored. Money and the checkout URL are copied
/// from the snapshot untouched.
#[must_use]
pub fn compute_view(
    snapshot: Option<&CartSnapshot>,
    pending: &[PendingMutation],
) -> OptimisticViewModel {
    let mut lines: Vec<OptimisticLine> = snapshot
        .map(|s| {
            s.lines()
                .iter()
                .map(|line| OptimisticLine {
                    id: line.id.clone(),
                    merchandise_id: line.merchandise.id.clone(),
                    merchandise: Some(line.merchandise.clone()),
                    quantity: line.quantity,
                    cost: Some(line.cost.clone()),
                    is_optimistic: false,
                })
                .collect()
        })
        .unwrap_or_default();

    for entry in pending {
        match &entry.mutation {
            CartMutation::Add(inputs) => {
                for (index, input) in inputs.iter().enumerate() {
                    if let Some(line) = lines
                        .iter_mut()
                        .find(|l| l.merchandise_id == input.merchandise_id)
                    {
                        line.quantity = line.quantity.saturating_add(input.quantity);
                        line.is_optimistic = true;
                        if line.merchandise.is_none() {
                            line.merchandise.clone_from(&input.preview);
                        }
                    } else {
                        lines.push(OptimisticLine {
                            id: CartLineId::optimistic(entry.id.as_u64(), index),
                            merchandise_id: input.merchandise_id.clone(),
                            merchandise: input.preview.clone(),
                            quantity: input.quantity,
                            cost: None,
                            is_optimistic: true,
                        });
                    }
                }
            }
            CartMutation::Update(updates) => {
                for update in updates {
                    if let Some(line) = lines.iter_mut().find(|l| l.id == update.id) {
                        line.quantity = update.quantity;
                        line.is_optimistic = true;
                    }
                }
            }
            CartMutation::Remove(ids) => {
                lines.retain(|l| !ids.contains(&l.id));
            }
        }
    }

    let total_quantity = lines.iter().map(|l| u64::from(l.quantity.get())).sum();
    let discount_codes = snapshot
        .map(|s| s.discount_codes.clone())
        .unwrap_or_default();

    OptimisticViewModel {
        cart_id: snapshot.map(|s| s.id.clone()),
        line_count: lines.len(),
        is_empty: lines.is_empty(),
        has_applicable_discount: discount_codes.iter().any(|d| d.applicable),
        lines,
        total_quantity,
        cost: snapshot.map(|s| s.cost.clone()),
        discount_codes,
        checkout: snapshot
            .and_then(|s| s.checkout_url.clone())
            .map_or(CheckoutHandoff::Disabled, |url| CheckoutHandoff::Link { url }),
        pending: pending.len(),
    }
}
