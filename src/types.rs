//! NewType wrappers for the numeric identifiers used throughout the service.
//!
//! These types prevent accidental mixing of semantically different ids
//! (e.g., passing a task id where the owning user id is expected).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to generate a NewType wrapper around an `i64` identifier.
macro_rules! newtype_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new instance.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value.
            pub const fn get(self) -> i64 {
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

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

newtype_id!(
    /// Identifier of a registered user.
    ///
    /// Allocated from the `user` sequence on registration and embedded in
    /// every access token as the `userId` claim.
    UserId
);

newtype_id!(
    /// Identifier of a task record.
    ///
    /// Task ids increase with insertion order, which is what makes them
    /// usable as a pagination watermark.
    TaskId
);
