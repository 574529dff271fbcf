//! Newtype IDs for type-safe platform references.
//!
//! Shopify identifies every object with an opaque global ID string
//! (`gid://shopify/Cart/...`). Use the `define_gid!` macro to create wrappers
//! that prevent accidentally mixing IDs from different entity types.

/// Prefix of identifiers that only exist in an optimistic cart overlay.
pub const OPTIMISTIC_LINE_PREFIX: &str = "optimistic://";

/// Errors that can occur when parsing a platform ID.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("{kind} cannot be empty")]
    Empty {
        /// Name of the ID type.
        kind: &'static str,
    },
}

/// Macro to define a type-safe global ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `parse()` rejecting empty input, `as_str()`
/// - `From<String>`, `From<&str>` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use limecart_core::define_gid;
/// define_gid!(OrderGid);
/// define_gid!(CustomerGid);
///
/// let order = OrderGid::parse("gid://shopify/Order/1").unwrap();
/// assert_eq!(order.as_str(), "gid://shopify/Order/1");
///
/// // These are different types, so this won't compile:
/// // let _: CustomerGid = order;
/// ```
#[macro_export]
macro_rules! define_gid {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse an ID, rejecting empty input.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is empty.
            pub fn parse(id: &str) -> ::core::result::Result<Self, $crate::types::id::IdError> {
                if id.is_empty() {
                    return Err($crate::types::id::IdError::Empty {
                        kind: stringify!($name),
                    });
                }
                Ok(Self(id.to_string()))
            }

            /// Get the underlying ID string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_gid!(CartId);
define_gid!(CartLineId);
define_gid!(MerchandiseId);
define_gid!(ProductId);

impl CartLineId {
    /// Build the local identifier of a line that only exists optimistically.
    ///
    /// `mutation` is the sequence number of the pending add and `index` the
    /// position of the line inside that add.
    #[must_use]
    pub fn optimistic(mutation: u64, index: usize) -> Self {
        Self(format!("{OPTIMISTIC_LINE_PREFIX}{mutation}/{index}"))
    }

    /// Whether this ID was minted locally for an optimistic line.
    #[must_use]
    pub fn is_optimistic(&self) -> bool {
        self.0.starts_with(OPTIMISTIC_LINE_PREFIX)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_empty() {
        let err = CartId::parse("").unwrap_err();
        assert_eq!(err, IdError::Empty { kind: "CartId" });
        assert_eq!(err.to_string(), "CartId cannot be empty");
    }

    #[test]
    fn test_display_is_raw_gid() {
        let id = CartLineId::parse("gid://shopify/CartLine/abc").unwrap();
        assert_eq!(id.to_string(), "gid://shopify/CartLine/abc");
    }

    #[test]
    fn test_optimistic_line_ids() {
        let id = CartLineId::optimistic(7, 1);
        assert_eq!(id.as_str(), "optimistic://7/1");
        assert!(id.is_optimistic());
        assert!(!CartLineId::from("gid://shopify/CartLine/1").is_optimistic());
    }

    #[test]
    fn test_serde_transparent() {
        let id = MerchandiseId::from("gid://shopify/ProductVariant/42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"gid://shopify/ProductVariant/42\"");
    }
}
