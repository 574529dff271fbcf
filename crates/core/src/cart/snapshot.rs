//! Authoritative cart snapshots.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::{
    CartId, CartLineId, CurrencyCode, MerchandiseId, Money, ProductId, Quantity,
};

/// Errors raised when a snapshot violates its invariants.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Two lines share the same identifier.
    #[error("duplicate cart line {0}")]
    DuplicateLine(CartLineId),

    /// An amount is in a different currency from the cart total.
    #[error("amount in {found} on a cart priced in {expected}")]
    MixedCurrency {
        /// Currency of the cart total.
        expected: CurrencyCode,
        /// Currency found elsewhere in the cart.
        found: CurrencyCode,
    },
}

/// Selected option on a product variant (e.g. `Size: M`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Option name.
    pub name: String,
    /// Selected value.
    pub value: String,
}

/// Parent product of a cart line's merchandise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    /// Product ID.
    pub id: ProductId,
    /// Product handle, used to build the product URL.
    pub handle: String,
    /// Product title.
    pub title: String,
}

/// Merchandise (product variant) held by a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchandise {
    /// Variant ID.
    pub id: MerchandiseId,
    /// Variant title.
    pub title: String,
    /// Parent product.
    pub product: ProductRef,
    /// Variant image URL.
    pub image_url: Option<String>,
    /// Selected options.
    pub selected_options: Vec<SelectedOption>,
}

/// Cost of a cart line as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCost {
    /// Price per unit.
    pub amount_per_quantity: Money,
    /// Subtotal before line-level discounts.
    pub subtotal_amount: Option<Money>,
    /// Total after discounts.
    pub total_amount: Money,
}

/// A line item in an authoritative snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Cart line ID, unique within the snapshot.
    pub id: CartLineId,
    /// Product variant.
    pub merchandise: Merchandise,
    /// Quantity (always at least one).
    pub quantity: Quantity,
    /// Line cost.
    pub cost: LineCost,
}

/// Cart cost summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCost {
    /// Subtotal before tax and shipping.
    pub subtotal_amount: Money,
    /// Total amount.
    pub total_amount: Money,
    /// Total tax, when estimated.
    pub total_tax_amount: Option<Money>,
    /// Total duties, when estimated.
    pub total_duty_amount: Option<Money>,
}

/// Discount code entered on the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    /// The code.
    pub code: String,
    /// Whether the code applies to the current cart contents.
    pub applicable: bool,
}

/// Cart state as last reported by the commerce platform.
///
/// Immutable once received. A new response replaces the whole snapshot, it is
/// never patched. Only built through [`CartSnapshot::new`], so every snapshot
/// has unique line IDs and a single currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    /// Cart ID.
    pub id: CartId,
    /// Lines in platform order.
    lines: Vec<LineItem>,
    /// Total quantity as reported by the platform.
    pub total_quantity: u64,
    /// Cost summary.
    pub cost: CartCost,
    /// Discount codes.
    pub discount_codes: Vec<DiscountCode>,
    /// Checkout handoff URL.
    pub checkout_url: Option<Url>,
    /// Buyer note.
    pub note: Option<String>,
    /// Last update on the platform.
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartSnapshot {
    /// Build a snapshot, checking that line IDs are unique and every amount is
    /// in the currency of the cart total.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::DuplicateLine`] if two lines share an ID, or
    /// [`SnapshotError::MixedCurrency`] if an amount is in another currency.
    pub fn new(
        id: CartId,
        lines: Vec<LineItem>,
        cost: CartCost,
        discount_codes: Vec<DiscountCode>,
        checkout_url: Option<Url>,
    ) -> Result<Self, SnapshotError> {
        let mut seen = HashSet::with_capacity(lines.len());
        for line in &lines {
            if !seen.insert(&line.id) {
                return Err(SnapshotError::DuplicateLine(line.id.clone()));
            }
        }

        let expected = &cost.total_amount.currency_code;
        let amounts = [
            Some(&cost.subtotal_amount),
            cost.total_tax_amount.as_ref(),
            cost.total_duty_amount.as_ref(),
        ]
        .into_iter()
        .flatten()
        .chain(lines.iter().flat_map(|l| {
            [
                Some(&l.cost.amount_per_quantity),
                l.cost.subtotal_amount.as_ref(),
                Some(&l.cost.total_amount),
            ]
            .into_iter()
            .flatten()
        }));
        for amount in amounts {
            if &amount.currency_code != expected {
                return Err(SnapshotError::MixedCurrency {
                    expected: expected.clone(),
                    found: amount.currency_code.clone(),
                });
            }
        }

        let total_quantity = lines.iter().map(|l| u64::from(l.quantity.get())).sum();

        Ok(Self {
            id,
            lines,
            total_quantity,
            cost,
            discount_codes,
            checkout_url,
            note: None,
            updated_at: None,
        })
    }

    /// Use the platform's own total instead of the sum of the lines.
    #[must_use]
    pub const fn with_total_quantity(mut self, total_quantity: u64) -> Self {
        self.total_quantity = total_quantity;
        self
    }

    /// Attach the buyer note.
    #[must_use]
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    /// Attach the last update timestamp.
    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: Option<DateTime<Utc>>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Whether the platform last changed this cart before it changed `other`.
    ///
    /// Snapshots without a timestamp are never older.
    #[must_use]
    pub fn is_older_than(&self, other: &Self) -> bool {
        matches!((self.updated_at, other.updated_at), (Some(this), Some(that)) if this < that)
    }

    /// Lines in platform order.
    #[must_use]
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// Find a line by ID.
    #[must_use]
    pub fn line(&self, id: &CartLineId) -> Option<&LineItem> {
        self.lines.iter().find(|l| &l.id == id)
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_duplicate_line_rejected() {
        let result = CartSnapshot::new(
            CartId::from("gid://shopify/Cart/c1"),
            vec![line("1", "x", 1), line("1", "y", 2)],
            snapshot(vec![]).cost,
            vec![],
            None,
        );
        assert_eq!(
            result.unwrap_err(),
            SnapshotError::DuplicateLine(CartLineId::from("gid://shopify/CartLine/1"))
        );
    }

    #[test]
    fn test_total_quantity_sums_lines() {
        let snap = snapshot(vec![line("1", "x", 2), line("2", "y", 3)]);
        assert_eq!(snap.total_quantity, 5);
        assert_eq!(snap.with_total_quantity(9).total_quantity, 9);
    }

    #[test]
    fn test_line_lookup() {
        let snap = snapshot(vec![line("1", "x", 2)]);
        let id = CartLineId::from("gid://shopify/CartLine/1");
        assert_eq!(snap.line(&id).unwrap().quantity.get(), 2);
        assert!(snap.line(&CartLineId::from("missing")).is_none());
    }

    #[test]
    fn test_mixed_currency_rejected() {
        let mut usd = line("2", "y", 1);
        usd.cost.total_amount = Money::parse("10.0", "USD").unwrap();

        let result = CartSnapshot::new(
            CartId::from("gid://shopify/Cart/c1"),
            vec![line("1", "x", 1), usd],
            snapshot(vec![]).cost,
            vec![],
            None,
        );
        assert_eq!(
            result.unwrap_err(),
            SnapshotError::MixedCurrency {
                expected: CurrencyCode::parse("BRL").unwrap(),
                found: CurrencyCode::parse("USD").unwrap(),
            }
        );
    }

    #[test]
    fn test_is_older_than_compares_platform_time() {
        let old = snapshot(vec![]).with_updated_at(Some(at(1)));
        let new = snapshot(vec![]).with_updated_at(Some(at(2)));
        let untimed = snapshot(vec![]);

        assert!(old.is_older_than(&new));
        assert!(!new.is_older_than(&old));
        assert!(!old.is_older_than(&old.clone()));
        assert!(!untimed.is_older_than(&new));
        assert!(!old.is_older_than(&untimed));
    }
}
