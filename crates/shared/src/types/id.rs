//! Typed IDs for type-safe entity references.
//!
//! Every row id is a 64-bit database sequence value. Wrapping it prevents
//! accidentally passing an `EntryId` where an `AccountId` is expected, and the
//! derived `Ord` is the strict total order used for lock sequencing.

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Creates an ID from a raw sequence value.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw sequence value.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

typed_id!(AccountId, "Unique identifier for a ledger account.");
typed_id!(EntryId, "Unique identifier for a ledger entry.");
typed_id!(TransferId, "Unique identifier for a transfer.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_id_roundtrip_raw() {
        let id = AccountId::new(42);
        assert_eq!(id.into_inner(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(AccountId::from(42), id);
    }

    #[test]
    fn test_typed_id_display() {
        assert_eq!(EntryId::new(7).to_string(), "7");
    }

    #[test]
    fn test_typed_id_from_str() {
        assert_eq!(TransferId::from_str("19").unwrap(), TransferId::new(19));
        assert!(TransferId::from_str("not-a-number").is_err());
    }

    #[test]
    fn test_typed_id_orders_numerically() {
        let mut ids = vec![AccountId::new(10), AccountId::new(2), AccountId::new(33)];
        ids.sort();
        assert_eq!(
            ids,
            vec![AccountId::new(2), AccountId::new(10), AccountId::new(33)]
        );
    }

    #[test]
    fn test_typed_id_serializes_transparently() {
        let json = serde_json::to_string(&AccountId::new(5)).unwrap();
        assert_eq!(json, "5");
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AccountId::new(5));
    }
}
