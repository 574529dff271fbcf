//! Integration tests for Limecart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p limecart-integration-tests
//! ```
//!
//! The tests drive real [`CartStore`](limecart_storefront::cart::CartStore)s
//! against [`FakePlatform`], an in-process stand-in for the commerce platform
//! that can hold responses back and reject mutations on demand.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use limecart_core::cart::{
    CartCost, LineCost, LineItem, LineUpdate, Merchandise, ProductRef,
};
use limecart_core::{
    CartId, CartLineId, CartMutation, CartSnapshot, CurrencyCode, MerchandiseId, Money, ProductId,
    Quantity,
};
use chrono::{DateTime, Utc};
use limecart_storefront::cart::CartApi;
use limecart_storefront::shopify::ShopifyError;
use rust_decimal::Decimal;
use tokio::sync::{oneshot, watch};
use url::Url;

/// Price of every unit on the fake platform.
pub const UNIT_PRICE: Decimal = Decimal::TEN;

/// Currency of the fake platform.
pub const CURRENCY: &str = "BRL";

/// Unix time of a freshly created cart.
const UPDATED_AT_ORIGIN: i64 = 1_760_000_000;

/// Releases one held response when sent to (or dropped).
pub type Gate = oneshot::Sender<()>;

#[derive(Debug, Clone)]
struct PlatformLine {
    id: CartLineId,
    merchandise_id: MerchandiseId,
    quantity: Quantity,
}

#[derive(Debug, Clone)]
struct PlatformCart {
    id: CartId,
    lines: Vec<PlatformLine>,
    // Bumped on every change; reported as `updatedAt` seconds.
    revision: i64,
}

impl PlatformCart {
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(UPDATED_AT_ORIGIN + self.revision, 0)
    }
}

#[derive(Debug, Default)]
struct Inner {
    carts: HashMap<CartId, PlatformCart>,
    carts_created: u64,
    next_line: u64,
    rejections: VecDeque<ShopifyError>,
    gates: VecDeque<oneshot::Receiver<()>>,
    fetch_error: Option<ShopifyError>,
}

impl Inner {
    fn next_line_id(&mut self) -> CartLineId {
        self.next_line += 1;
        CartLineId::from(format!("gid://shopify/CartLine/{}", self.next_line))
    }

    fn create_cart(&mut self) -> CartId {
        self.carts_created += 1;
        let id = CartId::from(format!("gid://shopify/Cart/{}", self.carts_created));
        self.carts.insert(
            id.clone(),
            PlatformCart {
                id: id.clone(),
                lines: Vec::new(),
                revision: 0,
            },
        );
        id
    }

    fn add(&mut self, cart_id: &CartId, merchandise_id: &MerchandiseId, quantity: Quantity) {
        let line_id = self.next_line_id();
        let Some(cart) = self.carts.get_mut(cart_id) else {
            return;
        };
        cart.revision += 1;

        if let Some(line) = cart
            .lines
            .iter_mut()
            .find(|l| &l.merchandise_id == merchandise_id)
        {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            cart.lines.push(PlatformLine {
                id: line_id,
                merchandise_id: merchandise_id.clone(),
                quantity,
            });
        }
    }

    fn apply(
        &mut self,
        cart_id: Option<&CartId>,
        mutation: &CartMutation,
    ) -> Result<CartSnapshot, ShopifyError> {
        let cart_id = match (cart_id, mutation) {
            (Some(id), _) if self.carts.contains_key(id) => id.clone(),
            (Some(id), _) => return Err(ShopifyError::NotFound(format!("Cart not found: {id}"))),
            (None, CartMutation::Add(_)) => self.create_cart(),
            (None, other) => {
                return Err(ShopifyError::NotFound(format!(
                    "no cart to apply {} to",
                    other.action()
                )));
            }
        };

        match mutation {
            CartMutation::Add(inputs) => {
                for input in inputs {
                    self.add(&cart_id, &input.merchandise_id, input.quantity);
                }
            }
            CartMutation::Update(updates) => self.update(&cart_id, updates)?,
            CartMutation::Remove(ids) => {
                if let Some(cart) = self.carts.get_mut(&cart_id) {
                    cart.lines.retain(|l| !ids.contains(&l.id));
                    cart.revision += 1;
                }
            }
        }

        self.snapshot(&cart_id)
    }

    fn update(&mut self, cart_id: &CartId, updates: &[LineUpdate]) -> Result<(), ShopifyError> {
        let Some(cart) = self.carts.get_mut(cart_id) else {
            return Err(ShopifyError::NotFound(format!("Cart not found: {cart_id}")));
        };
        cart.revision += 1;

        for update in updates {
            let line = cart
                .lines
                .iter_mut()
                .find(|l| l.id == update.id)
                .ok_or_else(|| {
                    ShopifyError::UserError(format!("The merchandise line {} does not exist", update.id))
                })?;
            line.quantity = update.quantity;
        }
        Ok(())
    }

    fn snapshot(&self, cart_id: &CartId) -> Result<CartSnapshot, ShopifyError> {
        let cart = self
            .carts
            .get(cart_id)
            .ok_or_else(|| ShopifyError::NotFound(format!("Cart not found: {cart_id}")))?;
        build_snapshot(cart)
    }
}

fn money(amount: Decimal) -> Result<Money, ShopifyError> {
    let currency =
        CurrencyCode::parse(CURRENCY).map_err(|e| ShopifyError::InvalidResponse(e.to_string()))?;
    Ok(Money::new(amount, currency))
}

fn merchandise(id: &MerchandiseId) -> Merchandise {
    Merchandise {
        id: id.clone(),
        title: "Default Title".to_string(),
        product: ProductRef {
            id: ProductId::from(format!("gid://shopify/Product/{id}")),
            handle: "lime".to_string(),
            title: "Lime".to_string(),
        },
        image_url: None,
        selected_options: vec![],
    }
}

fn build_snapshot(cart: &PlatformCart) -> Result<CartSnapshot, ShopifyError> {
    let mut subtotal = Decimal::ZERO;
    let mut lines = Vec::with_capacity(cart.lines.len());

    for line in &cart.lines {
        let total = UNIT_PRICE * Decimal::from(line.quantity.get());
        subtotal += total;
        lines.push(LineItem {
            id: line.id.clone(),
            merchandise: merchandise(&line.merchandise_id),
            quantity: line.quantity,
            cost: LineCost {
                amount_per_quantity: money(UNIT_PRICE)?,
                subtotal_amount: Some(money(total)?),
                total_amount: money(total)?,
            },
        });
    }

    let checkout_url = Url::parse(&format!(
        "https://shop.example.com/checkouts/{}",
        cart.id.as_str().rsplit('/').next().unwrap_or_default()
    ))
    .map_err(|e| ShopifyError::InvalidResponse(e.to_string()))?;

    CartSnapshot::new(
        cart.id.clone(),
        lines,
        CartCost {
            subtotal_amount: money(subtotal)?,
            total_amount: money(subtotal)?,
            total_tax_amount: None,
            total_duty_amount: None,
        },
        vec![],
        Some(checkout_url),
    )
    .map(|snapshot| snapshot.with_updated_at(cart.updated_at()))
    .map_err(|e| ShopifyError::InvalidResponse(e.to_string()))
}

/// In-process commerce platform.
///
/// Mutations are applied the moment they are submitted; only the response is
/// held back by a [`Gate`]. That matches a real platform where the cart
/// changes before the HTTP response reaches us.
#[derive(Debug)]
pub struct FakePlatform {
    inner: Mutex<Inner>,
    submissions: watch::Sender<usize>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlatform {
    /// Create an empty platform.
    #[must_use]
    pub fn new() -> Self {
        let (submissions, _) = watch::channel(0);
        Self {
            inner: Mutex::new(Inner::default()),
            submissions,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a cart holding `quantity` units of each variant.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be built.
    pub fn seed(&self, lines: &[(&str, u32)]) -> Result<CartSnapshot, ShopifyError> {
        let mut inner = self.inner();
        let cart_id = inner.create_cart();
        for (variant, quantity) in lines {
            let quantity = Quantity::new(*quantity)
                .ok_or_else(|| ShopifyError::UserError("quantity must be positive".to_string()))?;
            inner.add(&cart_id, &MerchandiseId::from(*variant), quantity);
        }
        inner.snapshot(&cart_id)
    }

    /// Hold the responses of the next `N` submissions until their gate fires.
    pub fn hold<const N: usize>(&self) -> [Gate; N] {
        let mut inner = self.inner();
        std::array::from_fn(|_| {
            let (gate, held) = oneshot::channel();
            inner.gates.push_back(held);
            gate
        })
    }

    /// Reject the next submission with a user error.
    pub fn reject_next(&self, message: &str) {
        self.inner()
            .rejections
            .push_back(ShopifyError::UserError(message.to_string()));
    }

    /// Fail every fetch with `error` until cleared.
    pub fn fail_fetches(&self, error: Option<ShopifyError>) {
        self.inner().fetch_error = error;
    }

    /// Number of carts created so far.
    #[must_use]
    pub fn carts_created(&self) -> u64 {
        self.inner().carts_created
    }

    /// Number of submissions received so far.
    #[must_use]
    pub fn submissions(&self) -> usize {
        *self.submissions.borrow()
    }

    /// Wait until at least `count` submissions have been received.
    pub async fn wait_for_submissions(&self, count: usize) {
        let mut receiver = self.submissions.subscribe();
        // The sender lives as long as `self`, so this only ends by matching.
        let _ = receiver.wait_for(|n| *n >= count).await;
    }
}

impl CartApi for FakePlatform {
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Option<CartSnapshot>, ShopifyError> {
        let inner = self.inner();
        if let Some(error) = &inner.fetch_error {
            return Err(ShopifyError::InvalidResponse(error.to_string()));
        }
        if !inner.carts.contains_key(cart_id) {
            return Ok(None);
        }
        inner.snapshot(cart_id).map(Some)
    }

    async fn submit(
        &self,
        cart_id: Option<&CartId>,
        mutation: &CartMutation,
    ) -> Result<CartSnapshot, ShopifyError> {
        let (result, gate) = {
            let mut inner = self.inner();
            let gate = inner.gates.pop_front();
            let result = match inner.rejections.pop_front() {
                Some(error) => Err(error),
                None => inner.apply(cart_id, mutation),
            };
            (result, gate)
        };

        self.submissions.send_modify(|n| *n += 1);

        if let Some(gate) = gate {
            // A dropped gate releases the response too.
            let _ = gate.await;
        }

        result
    }
}
