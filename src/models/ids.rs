//! Newtype wrappers for record identifiers.
//!
//! Every collection numbers its records independently, so the wrappers keep
//! an expense id from being passed where a transaction id is expected.

use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapping an `i64` store-assigned number.
macro_rules! define_record_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates a new identifier from the given value.
            #[inline]
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the inner value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Returns the identifier that follows this one.
            #[inline]
            #[must_use]
            pub const fn next(self) -> Self {
                Self(self.0.saturating_add(1))
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl core::str::FromStr for $name {
            type Err = core::num::ParseIntError;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<i64> for $name {
            #[inline]
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

define_record_id! {
    /// Unique identifier for an expense.
    ExpenseId
}

define_record_id! {
    /// Unique identifier for a top-up.
    TopUpId
}

define_record_id! {
    /// Unique identifier for a transaction (expense or transfer).
    TransactionId
}

define_record_id! {
    /// Unique identifier for a user.
    UserId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expense_id_is_transparent_on_the_wire() {
        let id = ExpenseId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let back: ExpenseId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn parse_from_path_segment() {
        let id: TopUpId = "17".parse().unwrap();
        assert_eq!(id.get(), 17);
        assert!("abc".parse::<TopUpId>().is_err());
    }

    #[test]
    fn next_saturates() {
        assert_eq!(UserId::new(1).next(), UserId::new(2));
        assert_eq!(UserId::new(i64::MAX).next(), UserId::new(i64::MAX));
    }

    #[test]
    fn display_matches_inner() {
        assert_eq!(TransactionId::new(9).to_string(), "9");
    }

    #[test]
    fn ordering_follows_inner_value() {
        assert!(ExpenseId::new(2) > ExpenseId::new(1));
    }
}
