//! GraphQL operation definitions for the Shopify Storefront API.
//!
//! Each operation is a unit struct implementing [`GraphQLQuery`] with a
//! sibling module holding its `Variables` and `ResponseData`, the same shape
//! `graphql_client` codegen produces. Documents are embedded as constants so
//! the crate builds without a local copy of the Storefront schema.

use graphql_client::{GraphQLQuery, QueryBody};

/// Fragments shared by every cart operation.
macro_rules! cart_fragments {
    () => {
        r"
fragment MoneyFields on MoneyV2 {
  amount
  currencyCode
}

fragment CartLineFields on BaseCartLine {
  id
  quantity
  cost {
    amountPerQuantity { ...MoneyFields }
    subtotalAmount { ...MoneyFields }
    totalAmount { ...MoneyFields }
  }
  merchandise {
    __typename
    ... on ProductVariant {
      id
      title
      image { url altText width height }
      product { id handle title }
      selectedOptions { name value }
    }
  }
}

fragment CartFields on Cart {
  id
  checkoutUrl
  totalQuantity
  note
  updatedAt
  cost {
    subtotalAmount { ...MoneyFields }
    totalAmount { ...MoneyFields }
    totalTaxAmount { ...MoneyFields }
    totalDutyAmount { ...MoneyFields }
  }
  discountCodes { code applicable }
  lines(first: 100) {
    nodes { ...CartLineFields }
  }
}
"
    };
}

/// Implement [`GraphQLQuery`] for an operation struct.
macro_rules! operation {
    ($name:ident, $module:ident, $operation:literal, $document:expr) => {
        impl GraphQLQuery for $name {
            type Variables = $module::Variables;
            type ResponseData = $module::ResponseData;

            fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
                QueryBody {
                    variables,
                    query: $document,
                    operation_name: $operation,
                }
            }
        }
    };
}

// =============================================================================
// Shared response types
// =============================================================================

/// Wire types shared by several operations.
pub mod fragments {
    use serde::{Deserialize, Serialize};

    /// `MoneyV2`: amounts are decimal strings.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MoneyFields {
        pub amount: String,
        pub currency_code: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ImageFields {
        pub url: String,
        pub alt_text: Option<String>,
        pub width: Option<i64>,
        pub height: Option<i64>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ProductRefFields {
        pub id: String,
        pub handle: String,
        pub title: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct SelectedOptionFields {
        pub name: String,
        pub value: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProductVariantFields {
        pub id: String,
        pub title: String,
        pub image: Option<ImageFields>,
        pub product: ProductRefFields,
        pub selected_options: Vec<SelectedOptionFields>,
    }

    /// `Merchandise` union, discriminated by `__typename`.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(tag = "__typename")]
    pub enum MerchandiseFields {
        ProductVariant(ProductVariantFields),
        #[serde(other)]
        Unsupported,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartLineCostFields {
        pub amount_per_quantity: MoneyFields,
        pub subtotal_amount: Option<MoneyFields>,
        pub total_amount: MoneyFields,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct CartLineFields {
        pub id: String,
        pub quantity: i64,
        pub cost: CartLineCostFields,
        pub merchandise: MerchandiseFields,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct CartLinesConnection {
        pub nodes: Vec<CartLineFields>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartCostFields {
        pub subtotal_amount: MoneyFields,
        pub total_amount: MoneyFields,
        pub total_tax_amount: Option<MoneyFields>,
        pub total_duty_amount: Option<MoneyFields>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct DiscountCodeFields {
        pub code: String,
        pub applicable: bool,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartFields {
        pub id: String,
        pub checkout_url: Option<String>,
        pub total_quantity: i64,
        pub note: Option<String>,
        pub updated_at: Option<String>,
        pub cost: CartCostFields,
        pub discount_codes: Vec<DiscountCodeFields>,
        pub lines: CartLinesConnection,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct CartUserErrorFields {
        pub code: Option<String>,
        pub field: Option<Vec<String>>,
        pub message: String,
    }

    /// Payload shared by every cart mutation.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartPayload {
        pub cart: Option<CartFields>,
        pub user_errors: Vec<CartUserErrorFields>,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartLineInput {
        pub merchandise_id: String,
        pub quantity: i64,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct CartLineUpdateInput {
        pub id: String,
        pub quantity: i64,
    }
}

// =============================================================================
// Cart queries and mutations
// =============================================================================

pub struct GetCart;

pub mod get_cart {
    use serde::{Deserialize, Serialize};

    pub use super::fragments::CartFields;

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub cart: Option<CartFields>,
    }
}

operation!(
    GetCart,
    get_cart,
    "GetCart",
    concat!(
        r"
query GetCart($cartId: ID!) {
  cart(id: $cartId) { ...CartFields }
}
",
        cart_fragments!()
    )
);

pub struct CreateCart;

pub mod create_cart {
    use serde::{Deserialize, Serialize};

    pub use super::fragments::{CartLineInput, CartPayload};

    #[derive(Debug, Clone, Serialize)]
    pub struct CartInput {
        pub lines: Vec<CartLineInput>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub input: CartInput,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_create: Option<CartPayload>,
    }
}

operation!(
    CreateCart,
    create_cart,
    "CreateCart",
    concat!(
        r"
mutation CreateCart($input: CartInput!) {
  cartCreate(input: $input) {
    cart { ...CartFields }
    userErrors { code field message }
  }
}
",
        cart_fragments!()
    )
);

pub struct AddCartLines;

pub mod add_cart_lines {
    use serde::{Deserialize, Serialize};

    pub use super::fragments::{CartLineInput, CartPayload};

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub lines: Vec<CartLineInput>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_lines_add: Option<CartPayload>,
    }
}

operation!(
    AddCartLines,
    add_cart_lines,
    "AddCartLines",
    concat!(
        r"
mutation AddCartLines($cartId: ID!, $lines: [CartLineInput!]!) {
  cartLinesAdd(cartId: $cartId, lines: $lines) {
    cart { ...CartFields }
    userErrors { code field message }
  }
}
",
        cart_fragments!()
    )
);

pub struct UpdateCartLines;

pub mod update_cart_lines {
    use serde::{Deserialize, Serialize};

    pub use super::fragments::{CartLineUpdateInput, CartPayload};

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub lines: Vec<CartLineUpdateInput>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_lines_update: Option<CartPayload>,
    }
}

operation!(
    UpdateCartLines,
    update_cart_lines,
    "UpdateCartLines",
    concat!(
        r"
mutation UpdateCartLines($cartId: ID!, $lines: [CartLineUpdateInput!]!) {
  cartLinesUpdate(cartId: $cartId, lines: $lines) {
    cart { ...CartFields }
    userErrors { code field message }
  }
}
",
        cart_fragments!()
    )
);

pub struct RemoveCartLines;

pub mod remove_cart_lines {
    use serde::{Deserialize, Serialize};

    pub use super::fragments::CartPayload;

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub line_ids: Vec<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_lines_remove: Option<CartPayload>,
    }
}

operation!(
    RemoveCartLines,
    remove_cart_lines,
    "RemoveCartLines",
    concat!(
        r"
mutation RemoveCartLines($cartId: ID!, $lineIds: [ID!]!) {
  cartLinesRemove(cartId: $cartId, lineIds: $lineIds) {
    cart { ...CartFields }
    userErrors { code field message }
  }
}
",
        cart_fragments!()
    )
);

// =============================================================================
// Catalog queries
// =============================================================================

pub struct RecommendedProducts;

pub mod recommended_products {
    use serde::{Deserialize, Serialize};

    pub use super::fragments::{ImageFields, MoneyFields};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub country: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub language: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PriceRange {
        pub min_variant_price: MoneyFields,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct MetafieldValue {
        pub value: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RecommendedProductFields {
        pub id: String,
        pub title: String,
        pub handle: String,
        pub price_range: PriceRange,
        pub featured_image: Option<ImageFields>,
        pub gift_product: Option<MetafieldValue>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ProductNodes {
        pub nodes: Vec<RecommendedProductFields>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub products: ProductNodes,
    }
}

operation!(
    RecommendedProducts,
    recommended_products,
    "RecommendedProducts",
    r#"
query RecommendedProducts($country: CountryCode, $language: LanguageCode)
  @inContext(country: $country, language: $language) {
  products(first: 4, sortKey: UPDATED_AT, reverse: true) {
    nodes {
      id
      title
      handle
      priceRange {
        minVariantPrice { amount currencyCode }
      }
      featuredImage { url altText width height }
      giftProduct: metafield(key: "giftcard", namespace: "custom") { value }
    }
  }
}
"#
);
