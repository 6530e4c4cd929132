//! Strongly-typed identifiers used across the domain.
//!
//! Every identifier here is an opaque string issued by the commerce platform.
//! Tenants are identified by their shop domain; contracts, orders and customers
//! by the platform's global ids (`gid://shopify/<Resource>/<n>`).

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const GID_PREFIX: &str = "gid://shopify/";

/// Identifier of a tenant (one merchant shop, the multi-tenant boundary).
///
/// Normalized to lowercase; must look like a host name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

/// Identifier of a recurring-purchase contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractId(String);

/// Identifier of an order created by a billing attempt (or a checkout).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

/// Identifier of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(String);

impl TenantId {
    /// Parse and normalize a shop domain.
    pub fn new(domain: impl AsRef<str>) -> Result<Self, DomainError> {
        let domain = domain.as_ref().trim().to_ascii_lowercase();
        if domain.is_empty() {
            return Err(DomainError::invalid_id("TenantId: empty shop domain"));
        }
        if !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || !domain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(DomainError::invalid_id(format!(
                "TenantId: not a shop domain: {domain}"
            )));
        }
        Ok(Self(domain))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_gid_newtype {
    ($t:ty, $name:literal, $resource:literal) => {
        impl $t {
            /// Wrap an identifier as issued by the platform.
            pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
                let raw = raw.into();
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
                    return Err(DomainError::invalid_id(format!("{}: {:?}", $name, raw)));
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Compose a global id from the numeric id carried by some webhook payloads.
            pub fn from_numeric(id: u64) -> Self {
                Self(format!("{}{}/{}", GID_PREFIX, $resource, id))
            }

            /// Numeric tail of a global id, if the id has that shape.
            pub fn numeric(&self) -> Option<u64> {
                self.0
                    .strip_prefix(GID_PREFIX)?
                    .strip_prefix($resource)?
                    .strip_prefix('/')?
                    .parse()
                    .ok()
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_gid_newtype!(ContractId, "ContractId", "SubscriptionContract");
impl_gid_newtype!(OrderId, "OrderId", "Order");
impl_gid_newtype!(CustomerId, "CustomerId", "Customer");

macro_rules! impl_string_conversions {
    ($t:ty) => {
        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                <$t>::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$t>::new(s)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_string_conversions!(TenantId);
impl_string_conversions!(ContractId);
impl_string_conversions!(OrderId);
impl_string_conversions!(CustomerId);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tenant_id_is_normalized() {
        let t = TenantId::new("  My-Shop.MyShopify.com ").unwrap();
        assert_eq!(t.as_str(), "my-shop.myshopify.com");
    }

    #[test]
    fn tenant_id_rejects_non_domains() {
        assert!(TenantId::new("").is_err());
        assert!(TenantId::new("no-dot").is_err());
        assert!(TenantId::new("bad shop.com").is_err());
        assert!(TenantId::new(".leading.com").is_err());
    }

    #[test]
    fn tenant_id_deserialization_validates() {
        let ok: Result<TenantId, _> = serde_json::from_str("\"shop.myshopify.com\"");
        assert!(ok.is_ok());
        let bad: Result<TenantId, _> = serde_json::from_str("\"not a shop\"");
        assert!(bad.is_err());
    }

    #[test]
    fn contract_id_composes_and_parses_gid() {
        let id = ContractId::from_numeric(42);
        assert_eq!(id.as_str(), "gid://shopify/SubscriptionContract/42");
        assert_eq!(id.numeric(), Some(42));

        let other: ContractId = "opaque-id".parse().unwrap();
        assert_eq!(other.numeric(), None);
    }

    #[test]
    fn gid_numeric_requires_matching_resource() {
        let order = OrderId::new("gid://shopify/Customer/7").unwrap();
        assert_eq!(order.numeric(), None);
    }

    proptest! {
        #[test]
        fn numeric_gids_round_trip(n in any::<u64>()) {
            prop_assert_eq!(OrderId::from_numeric(n).numeric(), Some(n));
        }
    }
}
