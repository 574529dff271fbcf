//! Cart type conversion functions.
//!
//! Wire data is validated here and nowhere else: once a [`CartSnapshot`]
//! exists, every ID, amount and quantity in it is well formed.

use chrono::{DateTime, Utc};
use limecart_core::cart::{
    CartCost, CartSnapshot, DiscountCode, LineCost, LineItem, Merchandise, ProductRef,
    SelectedOption,
};
use limecart_core::{CartId, CartLineId, MerchandiseId, Money, ProductId, Quantity};
use tracing::warn;
use url::Url;

use crate::shopify::ShopifyError;

use super::super::queries::fragments::{
    CartCostFields, CartFields, CartLineCostFields, CartLineFields, CartUserErrorFields,
    MerchandiseFields, MoneyFields, ProductVariantFields,
};

/// Convert a wire amount into [`Money`].
pub fn convert_money(money: &MoneyFields) -> Result<Money, ShopifyError> {
    Money::parse(&money.amount, &money.currency_code)
        .map_err(|e| ShopifyError::InvalidResponse(e.to_string()))
}

fn convert_optional_money(money: Option<&MoneyFields>) -> Result<Option<Money>, ShopifyError> {
    money.map(convert_money).transpose()
}

fn non_empty<T: From<String>>(id: String, kind: &str) -> Result<T, ShopifyError> {
    if id.is_empty() {
        return Err(ShopifyError::InvalidResponse(format!("empty {kind} id")));
    }
    Ok(T::from(id))
}

fn convert_cart_cost(cost: &CartCostFields) -> Result<CartCost, ShopifyError> {
    Ok(CartCost {
        subtotal_amount: convert_money(&cost.subtotal_amount)?,
        total_amount: convert_money(&cost.total_amount)?,
        total_tax_amount: convert_optional_money(cost.total_tax_amount.as_ref())?,
        total_duty_amount: convert_optional_money(cost.total_duty_amount.as_ref())?,
    })
}

fn convert_line_cost(cost: &CartLineCostFields) -> Result<LineCost, ShopifyError> {
    Ok(LineCost {
        amount_per_quantity: convert_money(&cost.amount_per_quantity)?,
        subtotal_amount: convert_optional_money(cost.subtotal_amount.as_ref())?,
        total_amount: convert_money(&cost.total_amount)?,
    })
}

fn convert_merchandise(variant: ProductVariantFields) -> Result<Merchandise, ShopifyError> {
    Ok(Merchandise {
        id: non_empty::<MerchandiseId>(variant.id, "merchandise")?,
        title: variant.title,
        product: ProductRef {
            id: non_empty::<ProductId>(variant.product.id, "product")?,
            handle: variant.product.handle,
            title: variant.product.title,
        },
        image_url: variant.image.map(|img| img.url),
        selected_options: variant
            .selected_options
            .into_iter()
            .map(|o| SelectedOption {
                name: o.name,
                value: o.value,
            })
            .collect(),
    })
}

/// Convert one cart line.
///
/// Returns `Ok(None)` for lines the cart model cannot represent (a quantity
/// below one, merchandise that is not a product variant); those are skipped
/// with a warning rather than failing the whole cart.
fn convert_cart_line(line: CartLineFields) -> Result<Option<LineItem>, ShopifyError> {
    let Ok(quantity) = Quantity::try_from(line.quantity) else {
        warn!(line_id = %line.id, quantity = line.quantity, "Skipping cart line with invalid quantity");
        return Ok(None);
    };

    let MerchandiseFields::ProductVariant(variant) = line.merchandise else {
        warn!(line_id = %line.id, "Skipping cart line with unsupported merchandise");
        return Ok(None);
    };

    Ok(Some(LineItem {
        id: non_empty::<CartLineId>(line.id, "cart line")?,
        cost: convert_line_cost(&line.cost)?,
        merchandise: convert_merchandise(variant)?,
        quantity,
    }))
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value.and_then(|v| match DateTime::parse_from_rfc3339(v) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            warn!(value = %v, error = %e, "Ignoring unparseable cart timestamp");
            None
        }
    })
}

/// Convert a cart response into an authoritative [`CartSnapshot`].
///
/// # Errors
///
/// Returns [`ShopifyError::InvalidResponse`] for malformed money, empty IDs,
/// an unparseable checkout URL or duplicate line IDs.
pub fn convert_cart(cart: CartFields) -> Result<CartSnapshot, ShopifyError> {
    let id = non_empty::<CartId>(cart.id, "cart")?;
    let cost = convert_cart_cost(&cart.cost)?;

    let checkout_url = cart
        .checkout_url
        .as_deref()
        .map(Url::parse)
        .transpose()
        .map_err(|e| ShopifyError::InvalidResponse(format!("checkout url: {e}")))?;

    let discount_codes = cart
        .discount_codes
        .into_iter()
        .map(|d| DiscountCode {
            code: d.code,
            applicable: d.applicable,
        })
        .collect();

    let mut lines = Vec::with_capacity(cart.lines.nodes.len());
    for node in cart.lines.nodes {
        if let Some(line) = convert_cart_line(node)? {
            lines.push(line);
        }
    }

    let total_quantity = u64::try_from(cart.total_quantity).map_err(|_| {
        ShopifyError::InvalidResponse(format!("negative total quantity {}", cart.total_quantity))
    })?;

    let snapshot = CartSnapshot::new(id, lines, cost, discount_codes, checkout_url)
        .map_err(|e| ShopifyError::InvalidResponse(e.to_string()))?
        .with_total_quantity(total_quantity)
        .with_note(cart.note)
        .with_updated_at(parse_timestamp(cart.updated_at.as_deref()));

    Ok(snapshot)
}

/// Join mutation user errors into a single message.
pub fn join_user_errors(errors: &[CartUserErrorFields]) -> String {
    errors
        .iter()
        .map(|e| match &e.field {
            Some(field) if !field.is_empty() => format!("{} ({})", e.message, field.join(".")),
            _ => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn money(amount: &str) -> serde_json::Value {
        json!({ "amount": amount, "currencyCode": "BRL" })
    }

    fn line(id: &str, quantity: i64) -> serde_json::Value {
        json!({
            "id": id,
            "quantity": quantity,
            "cost": {
                "amountPerQuantity": money("10.0"),
                "subtotalAmount": null,
                "totalAmount": money("10.0"),
            },
            "merchandise": {
                "__typename": "ProductVariant",
                "id": "gid://shopify/ProductVariant/1",
                "title": "Default Title",
                "image": { "url": "https://cdn.example.com/a.png", "altText": null, "width": 10, "height": 10 },
                "product": { "id": "gid://shopify/Product/1", "handle": "lime", "title": "Lime" },
                "selectedOptions": [{ "name": "Size", "value": "M" }],
            },
        })
    }

    fn cart(lines: Vec<serde_json::Value>) -> CartFields {
        serde_json::from_value(json!({
            "id": "gid://shopify/Cart/c1",
            "checkoutUrl": "https://shop.example.com/checkouts/c1",
            "totalQuantity": 3,
            "note": null,
            "updatedAt": "2026-01-02T03:04:05Z",
            "cost": {
                "subtotalAmount": money("30.0"),
                "totalAmount": money("33.5"),
                "totalTaxAmount": null,
                "totalDutyAmount": null,
            },
            "discountCodes": [{ "code": "LIME10", "applicable": true }],
            "lines": { "nodes": lines },
        }))
        .unwrap()
    }

    #[test]
    fn test_convert_cart() {
        let snapshot = convert_cart(cart(vec![line("gid://shopify/CartLine/1", 3)])).unwrap();

        assert_eq!(snapshot.id.as_str(), "gid://shopify/Cart/c1");
        assert_eq!(snapshot.total_quantity, 3);
        assert_eq!(snapshot.lines().len(), 1);
        assert_eq!(snapshot.lines()[0].quantity.get(), 3);
        assert_eq!(snapshot.cost.total_amount.to_string(), "33.50 BRL");
        assert!(snapshot.updated_at.is_some());
        assert_eq!(
            snapshot.checkout_url.unwrap().as_str(),
            "https://shop.example.com/checkouts/c1"
        );
    }

    #[test]
    fn test_lines_with_zero_quantity_are_skipped() {
        let snapshot = convert_cart(cart(vec![
            line("gid://shopify/CartLine/1", 0),
            line("gid://shopify/CartLine/2", 1),
        ]))
        .unwrap();

        assert_eq!(snapshot.lines().len(), 1);
        assert_eq!(snapshot.lines()[0].id.as_str(), "gid://shopify/CartLine/2");
    }

    #[test]
    fn test_unsupported_merchandise_is_skipped() {
        let mut gift = line("gid://shopify/CartLine/9", 1);
        gift["merchandise"] = json!({ "__typename": "SomethingElse" });
        let snapshot = convert_cart(cart(vec![gift])).unwrap();
        assert!(snapshot.lines().is_empty());
    }

    #[test]
    fn test_duplicate_lines_are_rejected() {
        let result = convert_cart(cart(vec![
            line("gid://shopify/CartLine/1", 1),
            line("gid://shopify/CartLine/1", 2),
        ]));
        assert!(matches!(result, Err(ShopifyError::InvalidResponse(_))));
    }

    #[test]
    fn test_invalid_money_is_rejected() {
        let mut bad = line("gid://shopify/CartLine/1", 1);
        bad["cost"]["totalAmount"] = json!({ "amount": "ten", "currencyCode": "BRL" });
        let result = convert_cart(cart(vec![bad]));
        assert!(matches!(result, Err(ShopifyError::InvalidResponse(_))));
    }

    #[test]
    fn test_mixed_currency_is_rejected() {
        let mut usd = line("gid://shopify/CartLine/1", 1);
        usd["cost"]["totalAmount"] = json!({ "amount": "2.0", "currencyCode": "USD" });
        let result = convert_cart(cart(vec![usd]));
        assert!(
            matches!(result, Err(ShopifyError::InvalidResponse(msg)) if msg.contains("USD"))
        );
    }

    #[test]
    fn test_join_user_errors() {
        let errors = vec![
            CartUserErrorFields {
                code: Some("INVALID".to_string()),
                field: Some(vec!["lines".to_string(), "0".to_string()]),
                message: "Variant is sold out".to_string(),
            },
            CartUserErrorFields {
                code: None,
                field: None,
                message: "Try again".to_string(),
            },
        ];
        assert_eq!(
            join_user_errors(&errors),
            "Variant is sold out (lines.0); Try again"
        );
    }
}
