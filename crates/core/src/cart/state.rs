//! Reconciliation state machine.
//!
//! `CartState` holds the only two inputs of the cart view: the last
//! authoritative snapshot and the pending mutations. Each successful platform
//! response is the new ground truth: it replaces the snapshot wholesale and
//! settles every mutation submitted up to and including the one it answers.
//! Mutations are never matched one-to-one against response contents.
//!
//! Responses can land in any order. The last one to land wins, unless the
//! platform's own `updatedAt` shows it describes an older cart than the one
//! already held.

use serde::Serialize;

use super::mutation::{CartMutation, MutationId, MutationState, PendingMutation};
use super::snapshot::CartSnapshot;
use super::view::{OptimisticViewModel, compute_view};
use crate::types::CartId;

/// Errors raised by invalid state transitions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartStateError {
    /// No mutation with this ID was ever queued.
    #[error("mutation {0} was never queued")]
    Unknown(MutationId),

    /// The mutation already settled or failed.
    #[error("mutation {0} is no longer pending")]
    NotPending(MutationId),

    /// The requested transition is not allowed from the current state.
    #[error("mutation {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        /// Mutation ID.
        id: MutationId,
        /// Current state.
        from: MutationState,
        /// Requested state.
        to: MutationState,
    },
}

/// Result of a terminal transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The platform answered; the mutation left the pending set.
    Settled {
        /// The answered mutation.
        id: MutationId,
        /// Earlier mutations dropped because the response covers them.
        superseded: Vec<MutationId>,
        /// Whether the response replaced the snapshot. `false` when the
        /// platform had already reported a later version of the cart.
        snapshot_applied: bool,
    },
    /// The mutation failed and its optimistic delta was discarded.
    Failed {
        /// The failed mutation.
        id: MutationId,
    },
}

impl MutationOutcome {
    /// Terminal state reached.
    #[must_use]
    pub const fn state(&self) -> MutationState {
        match self {
            Self::Settled { .. } => MutationState::Settled,
            Self::Failed { .. } => MutationState::Failed,
        }
    }
}

/// Last snapshot plus pending mutations for one cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartState {
    snapshot: Option<CartSnapshot>,
    pending: Vec<PendingMutation>,
    next_id: MutationId,
}

impl CartState {
    /// Start from a known snapshot, or none if the cart does not exist yet.
    #[must_use]
    pub fn new(snapshot: Option<CartSnapshot>) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    /// Last authoritative snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&CartSnapshot> {
        self.snapshot.as_ref()
    }

    /// Pending mutations in submission order.
    #[must_use]
    pub fn pending(&self) -> &[PendingMutation] {
        &self.pending
    }

    /// Platform cart ID, once the cart exists.
    #[must_use]
    pub fn cart_id(&self) -> Option<&CartId> {
        self.snapshot.as_ref().map(|s| &s.id)
    }

    /// Current view.
    #[must_use]
    pub fn view(&self) -> OptimisticViewModel {
        compute_view(self.snapshot.as_ref(), &self.pending)
    }

    /// Queue a mutation. Its effect is visible in the next [`view`](Self::view).
    pub fn enqueue(&mut self, mutation: CartMutation) -> MutationId {
        let id = self.next_id;
        self.next_id = id.next();
        self.pending.push(PendingMutation::queued(id, mutation));
        id
    }

    /// Record that the mutation was handed to the platform.
    ///
    /// # Errors
    ///
    /// Fails if the mutation is unknown, no longer pending, or already submitted.
    pub fn mark_submitted(&mut self, id: MutationId) -> Result<(), CartStateError> {
        let index = self.position(id)?;
        let entry = self
            .pending
            .get_mut(index)
            .ok_or(CartStateError::NotPending(id))?;

        if entry.state != MutationState::Queued {
            return Err(CartStateError::InvalidTransition {
                id,
                from: entry.state,
                to: MutationState::Submitted,
            });
        }
        entry.state = MutationState::Submitted;
        Ok(())
    }

    /// Apply the platform's response to a submitted mutation.
    ///
    /// The snapshot replaces the current one unless the platform stamped it
    /// earlier than the one already held, in which case it is stale and
    /// dropped. Either way every pending mutation up to `id` leaves the
    /// pending set.
    /// A mutation already superseded by a newer response settles without
    /// error.
    ///
    /// # Errors
    ///
    /// Fails if `id` was never queued, or is still queued (not submitted).
    pub fn settle(
        &mut self,
        id: MutationId,
        snapshot: CartSnapshot,
    ) -> Result<MutationOutcome, CartStateError> {
        match self.position(id) {
            Ok(index) => {
                let state = self
                    .pending
                    .get(index)
                    .map_or(MutationState::Queued, |p| p.state);
                if state != MutationState::Submitted {
                    return Err(CartStateError::InvalidTransition {
                        id,
                        from: state,
                        to: MutationState::Settled,
                    });
                }
            }
            Err(CartStateError::NotPending(_)) => {}
            Err(e) => return Err(e),
        }

        let snapshot_applied = self.accept(snapshot);

        let mut superseded = Vec::new();
        self.pending.retain(|p| {
            if p.id > id {
                return true;
            }
            if p.id != id {
                superseded.push(p.id);
            }
            false
        });

        Ok(MutationOutcome::Settled {
            id,
            superseded,
            snapshot_applied,
        })
    }

    /// Drop a mutation the platform rejected.
    ///
    /// The snapshot is untouched, so the next view shows the last
    /// authoritative state plus whatever is still pending.
    ///
    /// # Errors
    ///
    /// Fails if the mutation was never queued or already left the pending set.
    pub fn fail(&mut self, id: MutationId) -> Result<MutationOutcome, CartStateError> {
        let index = self.position(id)?;
        self.pending.remove(index);
        Ok(MutationOutcome::Failed { id })
    }

    /// Replace the snapshot with a freshly fetched one, keeping pending mutations.
    ///
    /// Returns `false` when the fetched copy is older than the snapshot
    /// already held and was dropped. `None` means the cart is gone.
    pub fn refresh(&mut self, snapshot: Option<CartSnapshot>) -> bool {
        match snapshot {
            Some(snapshot) => self.accept(snapshot),
            None => {
                self.snapshot = None;
                true
            }
        }
    }

    fn accept(&mut self, snapshot: CartSnapshot) -> bool {
        if self
            .snapshot
            .as_ref()
            .is_some_and(|current| snapshot.is_older_than(current))
        {
            return false;
        }
        self.snapshot = Some(snapshot);
        true
    }

    fn position(&self, id: MutationId) -> Result<usize, CartStateError> {
        if id >= self.next_id {
            return Err(CartStateError::Unknown(id));
        }
        self.pending
            .iter()
            .position(|p| p.id == id)
            .ok_or(CartStateError::NotPending(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::cart::mutation::LineInput;
    use crate::cart::snapshot::fixtures::{at, line, snapshot};
    use crate::types::{CartLineId, MerchandiseId, Quantity};

    fn line_id(n: &str) -> CartLineId {
        CartLineId::from(format!("gid://shopify/CartLine/{n}"))
    }

    fn add(variant: &str) -> CartMutation {
        CartMutation::Add(vec![LineInput::new(
            MerchandiseId::from(format!("gid://shopify/ProductVariant/{variant}")),
            Quantity::ONE,
        )])
    }

    #[test]
    fn test_enqueue_assigns_increasing_ids() {
        let mut state = CartState::new(None);
        let a = state.enqueue(add("x"));
        let b = state.enqueue(add("y"));
        assert!(a < b);
        assert_eq!(state.pending().len(), 2);
        assert_eq!(state.pending()[0].state, MutationState::Queued);
    }

    #[test]
    fn test_mark_submitted_transitions() {
        let mut state = CartState::new(None);
        let id = state.enqueue(add("x"));
        state.mark_submitted(id).unwrap();
        assert_eq!(state.pending()[0].state, MutationState::Submitted);

        assert_eq!(
            state.mark_submitted(id).unwrap_err(),
            CartStateError::InvalidTransition {
                id,
                from: MutationState::Submitted,
                to: MutationState::Submitted,
            }
        );
        assert_eq!(
            state.mark_submitted(MutationId::new(99)).unwrap_err(),
            CartStateError::Unknown(MutationId::new(99))
        );
    }

    #[test]
    fn test_settle_requires_submission() {
        let mut state = CartState::new(None);
        let id = state.enqueue(add("x"));
        let err = state.settle(id, snapshot(vec![])).unwrap_err();
        assert!(matches!(err, CartStateError::InvalidTransition { .. }));
    }

    #[test]
    fn test_settle_replaces_snapshot_and_clears_pending() {
        let mut state = CartState::new(Some(snapshot(vec![line("1", "x", 2)])));
        let id = state.enqueue(CartMutation::set_quantity(line_id("1"), 3));
        state.mark_submitted(id).unwrap();

        let outcome = state
            .settle(id, snapshot(vec![line("1", "x", 3)]))
            .unwrap();
        assert_eq!(outcome.state(), MutationState::Settled);
        assert!(state.pending().is_empty());

        let view = state.view();
        assert_eq!(view.lines[0].quantity.get(), 3);
        assert!(!view.lines[0].is_optimistic);
    }

    #[test]
    fn test_response_settles_earlier_mutations() {
        let mut state = CartState::new(Some(snapshot(vec![line("1", "x", 1)])));
        let first = state.enqueue(CartMutation::set_quantity(line_id("1"), 2));
        let second = state.enqueue(CartMutation::set_quantity(line_id("1"), 3));
        let third = state.enqueue(CartMutation::set_quantity(line_id("1"), 4));
        for id in [first, second, third] {
            state.mark_submitted(id).unwrap();
        }

        let outcome = state
            .settle(second, snapshot(vec![line("1", "x", 3)]))
            .unwrap();
        assert_eq!(
            outcome,
            MutationOutcome::Settled {
                id: second,
                superseded: vec![first],
                snapshot_applied: true,
            }
        );
        assert_eq!(state.pending().len(), 1);
        assert_eq!(state.pending()[0].id, third);
        // The third mutation still overlays the new snapshot.
        assert_eq!(state.view().lines[0].quantity.get(), 4);
    }

    #[test]
    fn test_last_response_wins_when_platform_order_differs() {
        let mut state = CartState::new(Some(
            snapshot(vec![line("1", "x", 1)]).with_updated_at(Some(at(0))),
        ));
        let add_y = state.enqueue(add("y"));
        let bump_x = state.enqueue(CartMutation::set_quantity(line_id("1"), 3));
        state.mark_submitted(add_y).unwrap();
        state.mark_submitted(bump_x).unwrap();

        // The platform ran the update first; its answer lands first.
        state
            .settle(
                bump_x,
                snapshot(vec![line("1", "x", 3)]).with_updated_at(Some(at(1))),
            )
            .unwrap();
        // The add ran second, so its answer holds both changes.
        let late = state
            .settle(
                add_y,
                snapshot(vec![line("1", "x", 3), line("2", "y", 1)])
                    .with_updated_at(Some(at(2))),
            )
            .unwrap();

        assert_eq!(
            late,
            MutationOutcome::Settled {
                id: add_y,
                superseded: vec![],
                snapshot_applied: true,
            }
        );
        let view = state.view();
        assert_eq!(view.line_count, 2);
        assert_eq!(view.pending, 0);
        assert!(view.lines.iter().all(|l| !l.is_optimistic));
    }

    #[test]
    fn test_response_older_than_snapshot_is_discarded() {
        let mut state = CartState::new(Some(snapshot(vec![line("1", "x", 1)])));
        let first = state.enqueue(CartMutation::set_quantity(line_id("1"), 2));
        let second = state.enqueue(CartMutation::set_quantity(line_id("1"), 3));
        state.mark_submitted(first).unwrap();
        state.mark_submitted(second).unwrap();

        state
            .settle(
                second,
                snapshot(vec![line("1", "x", 3)]).with_updated_at(Some(at(2))),
            )
            .unwrap();
        let late = state
            .settle(
                first,
                snapshot(vec![line("1", "x", 2)]).with_updated_at(Some(at(1))),
            )
            .unwrap();

        assert_eq!(
            late,
            MutationOutcome::Settled {
                id: first,
                superseded: vec![],
                snapshot_applied: false,
            }
        );
        assert_eq!(state.view().lines[0].quantity.get(), 3);
    }

    #[test]
    fn test_untimed_responses_apply_in_arrival_order() {
        let mut state = CartState::new(Some(snapshot(vec![line("1", "x", 1)])));
        let first = state.enqueue(CartMutation::set_quantity(line_id("1"), 2));
        let second = state.enqueue(CartMutation::set_quantity(line_id("1"), 3));
        state.mark_submitted(first).unwrap();
        state.mark_submitted(second).unwrap();

        state
            .settle(second, snapshot(vec![line("1", "x", 3)]))
            .unwrap();
        state
            .settle(first, snapshot(vec![line("1", "x", 2)]))
            .unwrap();

        assert_eq!(state.view().lines[0].quantity.get(), 2);
    }

    #[test]
    fn test_fail_reverts_to_snapshot() {
        let before = snapshot(vec![line("1", "x", 2)]);
        let mut state = CartState::new(Some(before.clone()));
        let baseline = state.view();

        let id = state.enqueue(CartMutation::set_quantity(line_id("1"), 5));
        state.mark_submitted(id).unwrap();
        assert_ne!(state.view(), baseline);

        let outcome = state.fail(id).unwrap();
        assert_eq!(outcome.state(), MutationState::Failed);
        assert_eq!(state.snapshot(), Some(&before));
        assert_eq!(state.view(), baseline);
    }

    #[test]
    fn test_fail_after_supersede_is_not_pending() {
        let mut state = CartState::new(None);
        let first = state.enqueue(add("x"));
        let second = state.enqueue(add("y"));
        state.mark_submitted(first).unwrap();
        state.mark_submitted(second).unwrap();
        state.settle(second, snapshot(vec![])).unwrap();

        assert_eq!(
            state.fail(first).unwrap_err(),
            CartStateError::NotPending(first)
        );
    }

    #[test]
    fn test_refresh_keeps_pending() {
        let mut state = CartState::new(None);
        state.enqueue(add("x"));
        state.refresh(Some(snapshot(vec![line("1", "y", 1)])));
        assert_eq!(state.pending().len(), 1);
        assert_eq!(state.view().line_count, 2);
        assert!(state.cart_id().is_some());
    }

    #[test]
    fn test_refresh_during_flight_then_settle() {
        let mut state = CartState::new(Some(
            snapshot(vec![line("1", "x", 1)]).with_updated_at(Some(at(0))),
        ));
        let id = state.enqueue(CartMutation::set_quantity(line_id("1"), 4));
        state.mark_submitted(id).unwrap();

        // The platform already applied the update when the fetch ran.
        assert!(state.refresh(Some(
            snapshot(vec![line("1", "x", 4)]).with_updated_at(Some(at(1))),
        )));
        let view = state.view();
        assert_eq!(view.lines[0].quantity.get(), 4);
        assert!(view.lines[0].is_optimistic);
        assert_eq!(view.pending, 1);

        state
            .settle(
                id,
                snapshot(vec![line("1", "x", 4)]).with_updated_at(Some(at(1))),
            )
            .unwrap();
        let view = state.view();
        assert_eq!(view.lines[0].quantity.get(), 4);
        assert!(!view.lines[0].is_optimistic);
        assert_eq!(view.pending, 0);
    }

    #[test]
    fn test_refresh_ignores_older_copy() {
        let mut state = CartState::new(Some(
            snapshot(vec![line("1", "x", 3)]).with_updated_at(Some(at(5))),
        ));

        assert!(!state.refresh(Some(
            snapshot(vec![line("1", "x", 1)]).with_updated_at(Some(at(4))),
        )));
        assert_eq!(state.view().lines[0].quantity.get(), 3);

        assert!(state.refresh(None));
        assert!(state.cart_id().is_none());
    }
}
