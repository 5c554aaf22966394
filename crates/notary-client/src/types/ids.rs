//! Identifier newtypes.
//!
//! Every identifier in the wallet is a thin wrapper around a `String` (the
//! on-wire form is a base64/hex-rendered hash of public material — see
//! `types::nym::Nym::id`). Keeping them as distinct types instead of bare
//! `String`s is what prevents a `NymId` from being passed where a
//! `ServerId` is expected at a call site.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(NymId, "Stable identifier of a Nym (hash of its public key material).");
string_id!(ServerId, "Identifier of a notary server, which is itself a NymId.");
string_id!(AssetId, "Identifier of an asset contract.");
string_id!(AccountId, "Identifier of an asset account.");

/// A scarce, server-issued transaction number.
///
/// Drawn from [`crate::client::number_manager::NumberManager`], spent on a
/// single request, and tracked through available/issued/tentative pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionNumber(pub u64);

impl fmt::Display for TransactionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TransactionNumber {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

/// Per-(Nym, server) monotonically increasing request sequence number.
///
/// Incremented on every outgoing request, even ones that fail, per
/// `RequestBuilder`'s contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestNumber(pub u64);

impl fmt::Display for RequestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
