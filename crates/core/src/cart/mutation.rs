//! Cart mutations and their lifecycle.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::snapshot::Merchandise;
use crate::types::{CartLineId, MerchandiseId, Quantity};

/// Action discriminator sent to the `/cart` route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartAction {
    /// Add lines (`cartLinesAdd`, or `cartCreate` when no cart exists).
    LinesAdd,
    /// Change line quantities (`cartLinesUpdate`).
    LinesUpdate,
    /// Remove lines (`cartLinesRemove`).
    LinesRemove,
}

impl CartAction {
    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LinesAdd => "LinesAdd",
            Self::LinesUpdate => "LinesUpdate",
            Self::LinesRemove => "LinesRemove",
        }
    }
}

impl fmt::Display for CartAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line to add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineInput {
    /// Product variant to add.
    pub merchandise_id: MerchandiseId,
    /// Quantity to add.
    #[serde(default)]
    pub quantity: Quantity,
    /// Variant details for rendering the line before the platform answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Merchandise>,
}

impl LineInput {
    /// Add `quantity` units of a variant without preview data.
    #[must_use]
    pub const fn new(merchandise_id: MerchandiseId, quantity: Quantity) -> Self {
        Self {
            merchandise_id,
            quantity,
            preview: None,
        }
    }

    /// Attach preview data for the optimistic line.
    #[must_use]
    pub fn with_preview(mut self, preview: Merchandise) -> Self {
        self.preview = Some(preview);
        self
    }
}

/// A new quantity for an existing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineUpdate {
    /// Line to update.
    pub id: CartLineId,
    /// New quantity.
    pub quantity: Quantity,
}

/// A change to the cart requested by the visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "inputs")]
pub enum CartMutation {
    /// Add lines, merging with lines of the same merchandise.
    #[serde(rename = "LinesAdd")]
    Add(Vec<LineInput>),
    /// Set line quantities.
    #[serde(rename = "LinesUpdate")]
    Update(Vec<LineUpdate>),
    /// Remove lines.
    #[serde(rename = "LinesRemove")]
    Remove(Vec<CartLineId>),
}

impl CartMutation {
    /// Set the quantity of one line.
    ///
    /// A requested quantity of zero becomes a remove so that no line is ever
    /// shown with zero items.
    #[must_use]
    pub fn set_quantity(id: CartLineId, requested: u32) -> Self {
        match Quantity::new(requested) {
            Some(quantity) => Self::Update(vec![LineUpdate { id, quantity }]),
            None => Self::Remove(vec![id]),
        }
    }

    /// Split a batch of quantity changes into an update and a remove.
    ///
    /// The update (if any) comes first, followed by the remove of every line
    /// requested at zero.
    #[must_use]
    pub fn update_lines(requests: Vec<(CartLineId, u32)>) -> Vec<Self> {
        let mut updates = Vec::new();
        let mut removals = Vec::new();

        for (id, requested) in requests {
            match Quantity::new(requested) {
                Some(quantity) => updates.push(LineUpdate { id, quantity }),
                None => removals.push(id),
            }
        }

        let mut mutations = Vec::with_capacity(2);
        if !updates.is_empty() {
            mutations.push(Self::Update(updates));
        }
        if !removals.is_empty() {
            mutations.push(Self::Remove(removals));
        }
        mutations
    }

    /// Wire discriminator of this mutation.
    #[must_use]
    pub const fn action(&self) -> CartAction {
        match self {
            Self::Add(_) => CartAction::LinesAdd,
            Self::Update(_) => CartAction::LinesUpdate,
            Self::Remove(_) => CartAction::LinesRemove,
        }
    }

    /// Whether the mutation carries no lines at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Add(lines) => lines.is_empty(),
            Self::Update(lines) => lines.is_empty(),
            Self::Remove(ids) => ids.is_empty(),
        }
    }
}

/// Sequence number of a mutation, in submission order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct MutationId(u64);

impl MutationId {
    /// Create a mutation ID from a sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Get the sequence number.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The following sequence number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a mutation.
///
/// ```text
/// Queued -> Submitted -> Settled
///                     \-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    /// Created by a visitor action, not yet handed to the platform.
    Queued,
    /// Handed to the platform, response pending.
    Submitted,
    /// Confirmed or superseded by a newer authoritative snapshot.
    Settled,
    /// The platform rejected the mutation or the request failed.
    Failed,
}

impl MutationState {
    /// Whether the mutation has left the pending set.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::Failed)
    }
}

/// A mutation that has not been answered by the platform yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMutation {
    /// Sequence number.
    pub id: MutationId,
    /// Requested change.
    pub mutation: CartMutation,
    /// Current lifecycle state (`Queued` or `Submitted`).
    pub state: MutationState,
}

impl PendingMutation {
    /// A freshly queued mutation.
    #[must_use]
    pub const fn queued(id: MutationId, mutation: CartMutation) -> Self {
        Self {
            id,
            mutation,
            state: MutationState::Queued,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn line_id(n: u32) -> CartLineId {
        CartLineId::from(format!("gid://shopify/CartLine/{n}"))
    }

    #[test]
    fn test_set_quantity_zero_is_remove() {
        assert_eq!(
            CartMutation::set_quantity(line_id(1), 0),
            CartMutation::Remove(vec![line_id(1)])
        );
        assert_eq!(
            CartMutation::set_quantity(line_id(1), 2).action(),
            CartAction::LinesUpdate
        );
    }

    #[test]
    fn test_update_lines_splits_zeroes() {
        let mutations =
            CartMutation::update_lines(vec![(line_id(1), 3), (line_id(2), 0), (line_id(3), 1)]);
        assert_eq!(mutations.len(), 2);
        assert_eq!(mutations[0].action(), CartAction::LinesUpdate);
        assert_eq!(mutations[1], CartMutation::Remove(vec![line_id(2)]));
    }

    #[test]
    fn test_update_lines_only_zeroes() {
        let mutations = CartMutation::update_lines(vec![(line_id(1), 0)]);
        assert_eq!(mutations, vec![CartMutation::Remove(vec![line_id(1)])]);
        assert!(CartMutation::update_lines(vec![]).is_empty());
    }

    #[test]
    fn test_cart_form_wire_format() {
        let json = serde_json::json!({
            "action": "LinesAdd",
            "inputs": [{ "merchandiseId": "gid://shopify/ProductVariant/9", "quantity": 2 }]
        });
        let mutation: CartMutation = serde_json::from_value(json).unwrap();
        assert_eq!(mutation.action(), CartAction::LinesAdd);
        assert_eq!(mutation.action().to_string(), "LinesAdd");
    }

    #[test]
    fn test_mutation_state_terminal() {
        assert!(!MutationState::Queued.is_terminal());
        assert!(!MutationState::Submitted.is_terminal());
        assert!(MutationState::Settled.is_terminal());
        assert!(MutationState::Failed.is_terminal());
    }

    #[test]
    fn test_mutation_id_ordering() {
        let first = MutationId::default();
        assert!(first < first.next());
        assert_eq!(first.next().to_string(), "#1");
    }
}
